// src/errors.rs

use thiserror::Error;

/// Every failure the gateway can report, normalized to a message plus an
/// optional HTTP status. Controllers store these in their error slots and
/// never branch on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    // Transport errors
    #[error("Network error: {0}")]
    Transport(String),

    // Server answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request failed ({status})")]
    Status { status: u16 },

    #[error("Invalid response: {0}")]
    Decode(String),

    // Client-side checks
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status attached to the failure, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } | AppError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;
