use crate::{
    controllers::RequestSeq,
    errors::AppError,
    models::{EmployeeId, PayrollHistory},
    services::DataGateway,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Payroll panel for the selected employee.
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    /// Employee the panel currently belongs to.
    pub employee_id: Option<EmployeeId>,
    /// Only ever holds the history of `employee_id`.
    pub history: Option<PayrollHistory>,
    pub loading: bool,
    pub error: Option<AppError>,
    seq: RequestSeq,
}

impl DetailState {
    pub fn is_idle(&self) -> bool {
        !self.loading
    }
}

/// Loads payroll history independently of the employee list: its own
/// loading flag, its own error slot.
#[derive(Clone)]
pub struct DetailLoader {
    gateway: Arc<dyn DataGateway>,
    state: Arc<watch::Sender<DetailState>>,
}

impl DetailLoader {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(watch::Sender::new(DetailState::default())),
        }
    }

    /// Fetch the payroll history of `employee_id`. Whatever was shown before
    /// is cleared immediately, not when the new history arrives.
    pub fn load(&self, employee_id: EmployeeId) {
        let mut issued = None;
        self.state.send_modify(|s| {
            issued = Some(s.seq.issue());
            s.employee_id = Some(employee_id);
            s.history = None;
            s.error = None;
            s.loading = true;
        });
        let Some(token) = issued else { return };

        debug!(%employee_id, ?token, "loading payroll history");

        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let result = gateway.employee_payroll(employee_id).await.and_then(|history| {
                if history.employee.id == employee_id {
                    Ok(history)
                } else {
                    Err(AppError::Decode(format!(
                        "payroll history for employee {} returned for {employee_id}",
                        history.employee.id
                    )))
                }
            });

            state.send_if_modified(|s| {
                if !s.seq.is_latest(token) {
                    debug!(%employee_id, ?token, "discarding stale payroll history");
                    return false;
                }
                s.loading = false;
                match result {
                    Ok(history) => {
                        info!(%employee_id, periods = history.payroll.len(), "payroll history loaded");
                        s.history = Some(history);
                    }
                    Err(e) => {
                        warn!(%employee_id, error = %e, "payroll history failed");
                        s.error = Some(e);
                    }
                }
                true
            });
        });
    }

    /// Retry the current employee, if any.
    pub fn reload(&self) {
        let current = self.state.borrow().employee_id;
        if let Some(employee_id) = current {
            self.load(employee_id);
        }
    }

    /// Empty the panel and drop any in-flight response.
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            s.seq.invalidate();
            s.employee_id = None;
            s.history = None;
            s.error = None;
            s.loading = false;
        });
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }
}
