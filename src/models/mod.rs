// src/models/mod.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Opaque employee identity assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub i64);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payroll reporting interval key, e.g. "2024-03".
/// Lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(pub String);

impl Period {
    pub fn new(key: impl Into<String>) -> Self {
        Period(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Period {
    fn from(key: &str) -> Self {
        Period(key.to_string())
    }
}

// ─── Employee Directory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    pub id: EmployeeId,
    /// Personnel number from the payroll export.
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl EmployeeSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive match against name and personnel number.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        format!("{} {} {}", self.first_name, self.last_name, self.external_id)
            .to_lowercase()
            .contains(&needle)
    }
}

/// Request for one page of the employee directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeQuery {
    /// Trimmed search text; `None` means no filter.
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl EmployeeQuery {
    pub fn new(search: &str, page: u32, page_size: u32) -> Self {
        let trimmed = search.trim();
        Self {
            search: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            page,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePage {
    pub items: Vec<EmployeeSummary>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl EmployeePage {
    pub fn contains(&self, id: EmployeeId) -> bool {
        self.items.iter().any(|e| e.id == id)
    }
}

/// Number of pages for `total` matches, never less than one.
pub fn page_count(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total.div_ceil(u64::from(page_size)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

// ─── Payroll History ──────────────────────────────────────────────────────────

/// One employee's payroll figures for one period. Amounts are in currency
/// units and are passed through exactly as the backend reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollPeriodRecord {
    pub period: Period,
    pub currency: String,

    pub gross_amount: Decimal,
    /// Employer social security contributions.
    pub sv_ag_amount: Decimal,
    /// Employer company pension contribution.
    pub ag_bav_amount: Decimal,
    pub subsidy_amount: Decimal,
    pub net_amount: Decimal,
    /// Employer levy.
    pub umlage_amount: Decimal,

    pub reimb_kk_amount: Decimal,
    pub flat_tax_amount: Decimal,
    pub reimb_ba_amount: Decimal,
    pub reimb_ifsg_amount: Decimal,

    pub total_cost_wo_reimb: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollHistory {
    pub employee: EmployeeSummary,
    pub payroll: Vec<PayrollPeriodRecord>,
}

impl PayrollHistory {
    pub fn record(&self, period: &Period) -> Option<&PayrollPeriodRecord> {
        self.payroll.iter().find(|r| &r.period == period)
    }

    /// Records sorted oldest first, for trend charts.
    pub fn chronological(&self) -> Vec<&PayrollPeriodRecord> {
        let mut rows: Vec<&PayrollPeriodRecord> = self.payroll.iter().collect();
        rows.sort_by(|a, b| a.period.cmp(&b.period));
        rows
    }
}

// ─── Dashboard Aggregates ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub period: Option<Period>,
    pub employee_count: u32,
    pub total_cost: Decimal,
    pub total_gross: Decimal,
    pub total_sv_ag: Decimal,
    pub total_reimb_kk: Decimal,
    pub total_reimb_ba: Decimal,
    pub total_reimb_ifsg: Decimal,
    pub last_import_status: Option<String>,
}

impl Kpis {
    pub fn total_reimbursements(&self) -> Decimal {
        self.total_reimb_kk + self.total_reimb_ba + self.total_reimb_ifsg
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    pub period: Period,
    pub employee_count: u32,
    pub total_cost: Decimal,
    pub gross: Decimal,
    pub sv_ag: Decimal,
    pub umlage: Decimal,
    pub ag_bav: Decimal,
    pub flat_tax: Decimal,
    pub reimb_kk: Decimal,
    pub reimb_ba: Decimal,
    pub reimb_ifsg: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEmployeeItem {
    pub employee_id: EmployeeId,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEmployees {
    pub period: Option<Period>,
    pub items: Vec<TopEmployeeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotItem {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotPeriod {
    pub period: Period,
    pub items: Vec<HotspotItem>,
}

// ─── Imports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: i64,
    pub filename: String,
    pub period: Option<Period>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Succeeded,
    Failed,
    Pending,
}

impl ImportJob {
    pub fn status_kind(&self) -> ImportStatus {
        let s = self.status.to_lowercase();
        if s.contains("success") || s.contains("done") || s.contains("finished") {
            ImportStatus::Succeeded
        } else if s.contains("fail") || s.contains("error") {
            ImportStatus::Failed
        } else {
            ImportStatus::Pending
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub id: i64,
    pub status: String,
    pub period: Option<Period>,
    pub filename: String,
}

// ─── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub role: String,
}
