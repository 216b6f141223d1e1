//! Scripted in-memory gateway for controller tests.

use crate::{
    errors::{AppError, AppResult},
    models::{
        EmployeeId, EmployeePage, EmployeeQuery, EmployeeSummary, HotspotItem, HotspotPeriod,
        ImportJob, Kpis, MonthlyRow, PayrollHistory, PayrollPeriodRecord, Period, TopEmployeeItem,
        TopEmployees, UploadResult,
    },
    services::DataGateway,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

pub(crate) const DEFAULT_LATENCY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    pub delay: Duration,
    pub fail: bool,
}

impl Step {
    pub fn ok(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            fail: false,
        }
    }

    pub fn fail(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            fail: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListEmployees(EmployeeQuery),
    Payroll(EmployeeId),
    Periods,
    Monthly,
    Kpis(Option<Period>),
    TopEmployees(Option<Period>, u32),
    Hotspots(u32),
    ListImports,
    Upload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Endpoint {
    Employees,
    Payroll,
    Periods,
    Monthly,
    Kpis,
    TopEmployees,
    Hotspots,
    Imports,
    Upload,
}

pub(crate) struct ScriptedGateway {
    roster: Vec<EmployeeSummary>,
    pub periods: Mutex<Vec<Period>>,
    pub monthly: Mutex<Vec<MonthlyRow>>,
    pub imports: Mutex<Vec<ImportJob>>,
    scripts: Mutex<HashMap<Endpoint, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGateway {
    /// Employees 1..=count, ordered by id.
    pub fn with_roster(count: i64) -> Self {
        let roster = (1..=count)
            .map(|i| EmployeeSummary {
                id: EmployeeId(i),
                external_id: format!("P{i:04}"),
                first_name: format!("First{i}"),
                last_name: format!("Last{i}"),
            })
            .collect();

        Self {
            roster,
            periods: Mutex::new(Vec::new()),
            monthly: Mutex::new(Vec::new()),
            imports: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_periods(self, periods: &[&str], monthly: &[&str]) -> Self {
        *self.periods.lock().unwrap() = periods.iter().map(|p| Period::from(*p)).collect();
        *self.monthly.lock().unwrap() = monthly.iter().map(|p| monthly_row(p)).collect();
        self
    }

    /// Queue behaviour for the next calls to `endpoint`; unscripted calls
    /// succeed after [`DEFAULT_LATENCY`].
    pub fn script(&self, endpoint: Endpoint, steps: impl IntoIterator<Item = Step>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .extend(steps);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_queries(&self) -> Vec<EmployeeQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ListEmployees(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    async fn run(&self, endpoint: Endpoint, call: Call) -> AppResult<()> {
        self.calls.lock().unwrap().push(call);
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step {
                delay: DEFAULT_LATENCY,
                fail: false,
            });

        tokio::time::sleep(step.delay).await;
        if step.fail {
            return Err(AppError::Api {
                status: 503,
                message: format!("{endpoint:?} unavailable"),
            });
        }
        Ok(())
    }
}

pub(crate) fn monthly_row(period: &str) -> MonthlyRow {
    MonthlyRow {
        period: Period::from(period),
        employee_count: 3,
        total_cost: Decimal::new(1_250_050, 2),
        gross: Decimal::new(1_000_000, 2),
        sv_ag: Decimal::new(200_000, 2),
        umlage: Decimal::new(10_000, 2),
        ag_bav: Decimal::new(5_000, 2),
        flat_tax: Decimal::ZERO,
        reimb_kk: Decimal::ZERO,
        reimb_ba: Decimal::ZERO,
        reimb_ifsg: Decimal::ZERO,
    }
}

fn payroll_record(period: &str) -> PayrollPeriodRecord {
    PayrollPeriodRecord {
        period: Period::from(period),
        currency: "EUR".to_string(),
        gross_amount: Decimal::new(320_000, 2),
        sv_ag_amount: Decimal::new(64_000, 2),
        ag_bav_amount: Decimal::ZERO,
        subsidy_amount: Decimal::ZERO,
        net_amount: Decimal::new(210_000, 2),
        umlage_amount: Decimal::new(3_900, 2),
        reimb_kk_amount: Decimal::ZERO,
        flat_tax_amount: Decimal::ZERO,
        reimb_ba_amount: Decimal::ZERO,
        reimb_ifsg_amount: Decimal::ZERO,
        total_cost_wo_reimb: Decimal::new(387_900, 2),
        total_cost: Decimal::new(387_900, 2),
    }
}

#[async_trait]
impl DataGateway for ScriptedGateway {
    async fn list_employees(&self, query: &EmployeeQuery) -> AppResult<EmployeePage> {
        self.run(Endpoint::Employees, Call::ListEmployees(query.clone()))
            .await?;

        let matching: Vec<EmployeeSummary> = self
            .roster
            .iter()
            .filter(|e| query.search.as_deref().is_none_or(|s| e.matches(s)))
            .cloned()
            .collect();
        let skip = (query.page.saturating_sub(1) * query.page_size) as usize;

        Ok(EmployeePage {
            total: matching.len() as u64,
            items: matching
                .into_iter()
                .skip(skip)
                .take(query.page_size as usize)
                .collect(),
            page: query.page,
            page_size: query.page_size,
        })
    }

    async fn employee_payroll(&self, employee_id: EmployeeId) -> AppResult<PayrollHistory> {
        self.run(Endpoint::Payroll, Call::Payroll(employee_id)).await?;

        let employee = self
            .roster
            .iter()
            .find(|e| e.id == employee_id)
            .cloned()
            .ok_or(AppError::Api {
                status: 404,
                message: "Employee not found".to_string(),
            })?;
        Ok(PayrollHistory {
            employee,
            payroll: vec![payroll_record("2024-02"), payroll_record("2024-01")],
        })
    }

    async fn periods(&self) -> AppResult<Vec<Period>> {
        self.run(Endpoint::Periods, Call::Periods).await?;
        Ok(self.periods.lock().unwrap().clone())
    }

    async fn monthly_costs(&self) -> AppResult<Vec<MonthlyRow>> {
        self.run(Endpoint::Monthly, Call::Monthly).await?;
        Ok(self.monthly.lock().unwrap().clone())
    }

    async fn kpis(&self, period: Option<&Period>) -> AppResult<Kpis> {
        self.run(Endpoint::Kpis, Call::Kpis(period.cloned())).await?;
        Ok(Kpis {
            period: period.cloned(),
            employee_count: self.roster.len() as u32,
            total_cost: Decimal::new(1_250_050, 2),
            total_gross: Decimal::new(1_000_000, 2),
            total_sv_ag: Decimal::new(200_000, 2),
            total_reimb_kk: Decimal::ZERO,
            total_reimb_ba: Decimal::ZERO,
            total_reimb_ifsg: Decimal::ZERO,
            last_import_status: Some("success".to_string()),
        })
    }

    async fn top_employees(&self, period: Option<&Period>, limit: u32) -> AppResult<TopEmployees> {
        self.run(Endpoint::TopEmployees, Call::TopEmployees(period.cloned(), limit))
            .await?;
        Ok(TopEmployees {
            period: period.cloned(),
            items: self
                .roster
                .iter()
                .take(limit as usize)
                .map(|e| TopEmployeeItem {
                    employee_id: e.id,
                    external_id: e.external_id.clone(),
                    first_name: e.first_name.clone(),
                    last_name: e.last_name.clone(),
                    total_cost: Decimal::new(400_000, 2),
                })
                .collect(),
        })
    }

    async fn hotspots(&self, limit: u32) -> AppResult<Vec<HotspotPeriod>> {
        self.run(Endpoint::Hotspots, Call::Hotspots(limit)).await?;
        let periods = self.periods.lock().unwrap().clone();
        Ok(periods
            .into_iter()
            .map(|period| HotspotPeriod {
                period,
                items: self
                    .roster
                    .iter()
                    .take(limit as usize)
                    .map(|e| HotspotItem {
                        external_id: e.external_id.clone(),
                        first_name: e.first_name.clone(),
                        last_name: e.last_name.clone(),
                        total_cost: Decimal::new(400_000, 2),
                    })
                    .collect(),
            })
            .collect())
    }

    async fn list_imports(&self) -> AppResult<Vec<ImportJob>> {
        self.run(Endpoint::Imports, Call::ListImports).await?;
        Ok(self.imports.lock().unwrap().clone())
    }

    async fn upload_import(&self, filename: &str, _contents: Vec<u8>) -> AppResult<UploadResult> {
        self.run(Endpoint::Upload, Call::Upload(filename.to_string()))
            .await?;

        let mut imports = self.imports.lock().unwrap();
        let id = imports.len() as i64 + 1;
        let job = ImportJob {
            id,
            filename: filename.to_string(),
            period: Some(Period::from("2024-03")),
            status: "success".to_string(),
        };
        imports.insert(0, job.clone());

        Ok(UploadResult {
            id,
            status: job.status,
            period: job.period,
            filename: job.filename,
        })
    }
}
