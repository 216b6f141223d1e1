use crate::{
    errors::AppResult,
    models::{
        EmployeeId, EmployeePage, EmployeeQuery, HotspotPeriod, ImportJob, Kpis, MonthlyRow,
        PayrollHistory, Period, TopEmployees, UploadResult,
    },
};
use async_trait::async_trait;

/// Typed access to the payroll reporting backend.
///
/// Controllers only ever talk to this trait; [`HttpGateway`](super::http::HttpGateway)
/// is the production implementation. Every failure comes back as a normalized
/// [`AppError`](crate::errors::AppError).
#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn list_employees(&self, query: &EmployeeQuery) -> AppResult<EmployeePage>;

    async fn employee_payroll(&self, employee_id: EmployeeId) -> AppResult<PayrollHistory>;

    /// Available periods, newest first.
    async fn periods(&self) -> AppResult<Vec<Period>>;

    async fn monthly_costs(&self) -> AppResult<Vec<MonthlyRow>>;

    /// KPIs for `period`, or the latest period when `None`.
    async fn kpis(&self, period: Option<&Period>) -> AppResult<Kpis>;

    async fn top_employees(&self, period: Option<&Period>, limit: u32) -> AppResult<TopEmployees>;

    async fn hotspots(&self, limit: u32) -> AppResult<Vec<HotspotPeriod>>;

    async fn list_imports(&self) -> AppResult<Vec<ImportJob>>;

    async fn upload_import(&self, filename: &str, contents: Vec<u8>) -> AppResult<UploadResult>;
}
