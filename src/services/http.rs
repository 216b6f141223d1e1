use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::{
        EmployeeId, EmployeePage, EmployeeQuery, HotspotPeriod, ImportJob, Kpis, LoginRequest,
        MonthlyRow, PayrollHistory, Period, TopEmployees, UploadResult, UserOut,
    },
    services::gateway::DataGateway,
};
use async_trait::async_trait;
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// reqwest-backed gateway. The client keeps a cookie store, so a successful
/// [`login`](HttpGateway::login) authenticates every later request.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

type Params = Vec<(&'static str, String)>;

impl HttpGateway {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &Params) -> AppResult<T> {
        let url = self.url(path);
        debug!(%url, ?params, "GET");

        let resp = self.client.get(&url).query(params).send().await?;
        read_json(resp).await
    }

    /// Open a cookie session for the given user.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<UserOut> {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn logout(&self) -> AppResult<()> {
        let resp = self.client.post(self.url("/api/auth/logout")).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }

    /// The user owning the current session.
    pub async fn me(&self) -> AppResult<UserOut> {
        self.get_json("/api/auth/me", &Vec::new()).await
    }
}

#[async_trait]
impl DataGateway for HttpGateway {
    async fn list_employees(&self, query: &EmployeeQuery) -> AppResult<EmployeePage> {
        let mut params: Params = Vec::new();
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        params.push(("page", query.page.to_string()));
        params.push(("page_size", query.page_size.to_string()));

        self.get_json("/api/employees", &params).await
    }

    async fn employee_payroll(&self, employee_id: EmployeeId) -> AppResult<PayrollHistory> {
        self.get_json(&format!("/api/employees/{employee_id}/payroll"), &Vec::new())
            .await
    }

    async fn periods(&self) -> AppResult<Vec<Period>> {
        self.get_json("/api/dashboard/periods", &Vec::new()).await
    }

    async fn monthly_costs(&self) -> AppResult<Vec<MonthlyRow>> {
        self.get_json("/api/dashboard/monthly-costs", &Vec::new())
            .await
    }

    async fn kpis(&self, period: Option<&Period>) -> AppResult<Kpis> {
        let params: Params = period
            .map(|p| vec![("period", p.to_string())])
            .unwrap_or_default();
        self.get_json("/api/dashboard/kpis", &params).await
    }

    async fn top_employees(&self, period: Option<&Period>, limit: u32) -> AppResult<TopEmployees> {
        let mut params: Params = Vec::new();
        if let Some(p) = period {
            params.push(("period", p.to_string()));
        }
        params.push(("limit", limit.to_string()));
        self.get_json("/api/dashboard/top-employees", &params).await
    }

    async fn hotspots(&self, limit: u32) -> AppResult<Vec<HotspotPeriod>> {
        self.get_json("/api/dashboard/hotspots", &vec![("limit", limit.to_string())])
            .await
    }

    async fn list_imports(&self) -> AppResult<Vec<ImportJob>> {
        self.get_json("/api/imports", &Vec::new()).await
    }

    async fn upload_import(&self, filename: &str, contents: Vec<u8>) -> AppResult<UploadResult> {
        let part = Part::bytes(contents)
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let url = self.url("/api/imports");
        debug!(%url, filename, "POST multipart");

        let resp = self.client.post(&url).multipart(form).send().await?;
        read_json(resp).await
    }
}

async fn ensure_success(resp: Response) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    // An unreadable body is treated like an empty one.
    let body = resp.text().await.unwrap_or_default();
    let err = error_from_body(status.as_u16(), &body);
    warn!(status = status.as_u16(), error = %err, "request failed");
    Err(err)
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> AppResult<T> {
    ensure_success(resp)
        .await?
        .json::<T>()
        .await
        .map_err(|e| AppError::Decode(e.to_string()))
}

/// Map a non-success body onto the error taxonomy: a JSON payload with a
/// `detail` or `message` string is structured, anything else is bare.
pub(crate) fn error_from_body(status: u16, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|payload| {
        ["detail", "message"]
            .iter()
            .find_map(|key| payload.get(key).and_then(Value::as_str).map(str::to_string))
    });

    match message {
        Some(message) => AppError::Api { status, message },
        None => AppError::Status { status },
    }
}
