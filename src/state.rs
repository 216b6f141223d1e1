use crate::{
    config::Config,
    controllers::{DashboardOrchestrator, DirectoryController, DirectorySettings, ImportsController},
    services::DataGateway,
};
use std::sync::Arc;

/// Gateway and configuration shared by every view. Each view gets its own
/// controller, created when the view mounts.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn DataGateway>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn DataGateway>, config: Config) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    pub fn directory(&self) -> DirectoryController {
        DirectoryController::mount(
            Arc::clone(&self.gateway),
            DirectorySettings {
                page_size: self.config.employee_page_size,
                debounce: self.config.search_debounce(),
            },
        )
    }

    pub fn dashboard(&self) -> DashboardOrchestrator {
        DashboardOrchestrator::mount(
            Arc::clone(&self.gateway),
            self.config.top_employees_limit,
            self.config.hotspots_limit,
        )
    }

    pub fn imports(&self) -> ImportsController {
        ImportsController::mount(Arc::clone(&self.gateway))
    }
}
