use crate::errors::{AppError, AppResult};
use dotenvy::dotenv;
use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_username: Option<String>,
    pub api_password: Option<String>,
    pub search_debounce_ms: u64,
    pub employee_page_size: u32,
    pub top_employees_limit: u32,
    pub hotspots_limit: u32,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            api_username: None,
            api_password: None,
            search_debounce_ms: 250,
            employee_page_size: 25,
            top_employees_limit: 5,
            hotspots_limit: 5,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_username: env::var("API_USERNAME").ok(),
            api_password: env::var("API_PASSWORD").ok(),
            search_debounce_ms: parse_var("SEARCH_DEBOUNCE_MS", defaults.search_debounce_ms)?,
            employee_page_size: parse_var("EMPLOYEE_PAGE_SIZE", defaults.employee_page_size)?,
            top_employees_limit: parse_var("TOP_EMPLOYEES_LIMIT", defaults.top_employees_limit)?,
            hotspots_limit: parse_var("HOTSPOTS_LIMIT", defaults.hotspots_limit)?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
        }
        .validated()?)
    }

    fn validated(self) -> AppResult<Self> {
        if self.employee_page_size == 0 {
            return Err(AppError::Config(
                "EMPLOYEE_PAGE_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Username and password, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.api_username, &self.api_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
