//! Two-phase dashboard loading.
//!
//! Phase 1 runs once at mount and loads the period-independent collections
//! (available periods, monthly series, hotspots) in parallel, then derives the
//! initial period. Phase 2 loads the KPI snapshot and the top-employee list
//! for the selected period, in parallel, and re-runs whenever the selection
//! changes. The two results of phase 2 are written in one mutation, as one
//! [`PeriodPanel`], so they can never describe different periods.
//!
//! Each phase has its own [`PhaseStatus`]; retrying one never refetches the
//! other.

use crate::{
    controllers::{PhaseStatus, RequestSeq, RequestToken},
    errors::{AppError, AppResult},
    models::{HotspotPeriod, Kpis, MonthlyRow, Period, TopEmployees},
    services::DataGateway,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// KPI snapshot and top employees of one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPanel {
    pub period: Period,
    pub kpis: Kpis,
    pub top: TopEmployees,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Newest first, as served.
    pub periods: Option<Vec<Period>>,
    pub monthly: Option<Vec<MonthlyRow>>,
    pub hotspots: Option<Vec<HotspotPeriod>>,
    pub selected_period: Option<Period>,
    pub panel: Option<PeriodPanel>,
    pub global: PhaseStatus,
    pub period_phase: PhaseStatus,
    global_seq: RequestSeq,
    period_seq: RequestSeq,
}

/// Everything the dashboard page renders, available only once both phases
/// have produced data.
#[derive(Debug)]
pub struct DashboardView<'a> {
    pub periods: &'a [Period],
    pub monthly: &'a [MonthlyRow],
    pub hotspots: &'a [HotspotPeriod],
    pub selected_period: &'a Period,
    pub panel: &'a PeriodPanel,
}

impl DashboardView<'_> {
    /// The panel still shows the previous period while the new one loads.
    pub fn panel_is_stale(&self) -> bool {
        &self.panel.period != self.selected_period
    }
}

type GlobalData = (Vec<Period>, Vec<MonthlyRow>, Vec<HotspotPeriod>);

/// Initial period: the first available period, else the chronologically
/// last period of the monthly series.
pub fn derive_initial_period(periods: &[Period], monthly: &[MonthlyRow]) -> Option<Period> {
    periods
        .first()
        .or_else(|| monthly.iter().map(|row| &row.period).max())
        .cloned()
}

impl DashboardState {
    pub fn ready(&self) -> Option<DashboardView<'_>> {
        Some(DashboardView {
            periods: self.periods.as_deref()?,
            monthly: self.monthly.as_deref()?,
            hotspots: self.hotspots.as_deref().unwrap_or_default(),
            selected_period: self.selected_period.as_ref()?,
            panel: self.panel.as_ref()?,
        })
    }

    pub fn is_idle(&self) -> bool {
        !self.global.loading && !self.period_phase.loading
    }

    /// Chronological monthly series for trend charts.
    pub fn monthly_chronological(&self) -> Vec<&MonthlyRow> {
        let mut rows: Vec<&MonthlyRow> = self.monthly.iter().flatten().collect();
        rows.sort_by(|a, b| a.period.cmp(&b.period));
        rows
    }

    fn is_selectable(&self, period: &Period) -> bool {
        match (&self.periods, &self.monthly) {
            (Some(periods), _) if !periods.is_empty() => periods.contains(period),
            (_, Some(monthly)) => monthly.iter().any(|row| &row.period == period),
            _ => false,
        }
    }

    fn begin_global(&mut self) -> RequestToken {
        self.global.begin();
        self.global_seq.issue()
    }

    /// Returns the period phase 2 must load when the selection changed.
    fn apply_global(&mut self, token: RequestToken, result: AppResult<GlobalData>) -> Option<Period> {
        if !self.global_seq.is_latest(token) {
            return None;
        }

        let (periods, monthly, hotspots) = match result {
            Ok(data) => data,
            Err(e) => {
                self.global.finish(Some(e));
                return None;
            }
        };
        self.global.finish(None);
        self.periods = Some(periods);
        self.monthly = Some(monthly);
        self.hotspots = Some(hotspots);

        if let Some(current) = &self.selected_period {
            if self.is_selectable(current) {
                return None;
            }
        }

        let next = derive_initial_period(
            self.periods.as_deref().unwrap_or_default(),
            self.monthly.as_deref().unwrap_or_default(),
        );
        if next == self.selected_period {
            return None;
        }
        self.selected_period = next.clone();
        next
    }

    fn begin_period(&mut self) -> Option<(RequestToken, Period)> {
        let period = self.selected_period.clone()?;
        self.period_phase.begin();
        Some((self.period_seq.issue(), period))
    }

    fn apply_period(
        &mut self,
        token: RequestToken,
        period: Period,
        result: AppResult<(Kpis, TopEmployees)>,
    ) -> bool {
        if !self.period_seq.is_latest(token) {
            return false;
        }
        match result {
            Ok((kpis, top)) => {
                self.period_phase.finish(None);
                self.panel = Some(PeriodPanel { period, kpis, top });
            }
            Err(e) => self.period_phase.finish(Some(e)),
        }
        true
    }
}

struct Shared {
    gateway: Arc<dyn DataGateway>,
    state: watch::Sender<DashboardState>,
    top_limit: u32,
    hotspot_limit: u32,
}

impl Shared {
    fn run_global(self: &Arc<Self>) {
        let mut token = None;
        self.state.send_modify(|s| token = Some(s.begin_global()));
        let Some(token) = token else { return };

        debug!(?token, "loading dashboard overview");
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let gateway = &shared.gateway;
            let (periods, monthly, hotspots) = tokio::join!(
                gateway.periods(),
                gateway.monthly_costs(),
                gateway.hotspots(shared.hotspot_limit),
            );
            let result = periods.and_then(|p| Ok((p, monthly?, hotspots?)));
            if let Err(e) = &result {
                warn!(error = %e, "dashboard overview failed");
            }

            // Phase 2 is issued in the same mutation that selects the period.
            let mut issued = None;
            shared.state.send_if_modified(|s| {
                if !s.global_seq.is_latest(token) {
                    return false;
                }
                if let Some(period) = s.apply_global(token, result) {
                    info!(%period, "period selected");
                    issued = s.begin_period();
                }
                true
            });

            if let Some((token, period)) = issued {
                shared.spawn_period(token, period);
            }
        });
    }

    fn run_period(self: &Arc<Self>) {
        let mut issued = None;
        self.state.send_if_modified(|s| {
            issued = s.begin_period();
            issued.is_some()
        });
        if let Some((token, period)) = issued {
            self.spawn_period(token, period);
        }
    }

    fn spawn_period(self: &Arc<Self>, token: RequestToken, period: Period) {
        debug!(?token, %period, "loading period panel");
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let gateway = &shared.gateway;
            let (kpis, top) = tokio::join!(
                gateway.kpis(Some(&period)),
                gateway.top_employees(Some(&period), shared.top_limit),
            );
            let result = kpis.and_then(|k| Ok((k, top?)));
            match &result {
                Ok(_) => info!(%period, "period panel loaded"),
                Err(e) => warn!(%period, error = %e, "period panel failed"),
            }

            shared
                .state
                .send_if_modified(|s| s.apply_period(token, period, result));
        });
    }
}

/// Controller for one mounted dashboard view.
pub struct DashboardOrchestrator {
    shared: Arc<Shared>,
}

impl DashboardOrchestrator {
    /// Mount the view and start phase 1.
    pub fn mount(gateway: Arc<dyn DataGateway>, top_limit: u32, hotspot_limit: u32) -> Self {
        let shared = Arc::new(Shared {
            gateway,
            state: watch::Sender::new(DashboardState::default()),
            top_limit,
            hotspot_limit,
        });
        shared.run_global();
        Self { shared }
    }

    /// Change the period; phase 2 re-runs when it actually changed.
    pub fn select_period(&self, period: Period) -> AppResult<()> {
        let mut outcome = Ok(None);
        self.shared.state.send_if_modified(|s| {
            if s.selected_period.as_ref() == Some(&period) {
                return false;
            }
            if !s.is_selectable(&period) {
                outcome = Err(AppError::Validation(format!(
                    "period {period} is not available"
                )));
                return false;
            }
            s.selected_period = Some(period.clone());
            outcome = Ok(s.begin_period());
            true
        });

        if let Some((token, period)) = outcome? {
            self.shared.spawn_period(token, period);
        }
        Ok(())
    }

    /// Retry phase 1 only.
    pub fn reload_global(&self) {
        self.shared.run_global();
    }

    /// Retry phase 2 only.
    pub fn reload_period(&self) {
        self.shared.run_period();
    }

    pub fn state(&self) -> DashboardState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.shared.state.subscribe()
    }
}

impl Drop for DashboardOrchestrator {
    fn drop(&mut self) {
        self.shared.state.send_modify(|s| {
            s.global_seq.invalidate();
            s.period_seq.invalidate();
            s.global.loading = false;
            s.period_phase.loading = false;
        });
    }
}
