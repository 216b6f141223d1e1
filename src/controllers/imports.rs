use crate::{
    controllers::{PhaseStatus, RequestSeq},
    errors::{AppError, AppResult},
    models::{ImportJob, UploadResult},
    services::DataGateway,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub busy: bool,
    pub error: Option<AppError>,
    pub last_result: Option<UploadResult>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportsState {
    /// Latest jobs first; `None` until the history first loads.
    pub jobs: Option<Vec<ImportJob>>,
    pub history: PhaseStatus,
    pub upload: UploadState,
    seq: RequestSeq,
}

impl ImportsState {
    pub fn is_idle(&self) -> bool {
        !self.history.loading && !self.upload.busy
    }
}

/// Import history list plus CSV upload.
pub struct ImportsController {
    gateway: Arc<dyn DataGateway>,
    state: Arc<watch::Sender<ImportsState>>,
}

/// Clears the busy flag however the upload future ends, including when it
/// is dropped mid-flight.
struct BusyGuard(Arc<watch::Sender<ImportsState>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0
            .send_if_modified(|s| std::mem::replace(&mut s.upload.busy, false));
    }
}

fn validate_upload(filename: &str) -> AppResult<()> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("Please choose a CSV file".to_string()));
    }
    if !filename.to_lowercase().ends_with(".csv") {
        return Err(AppError::Validation(
            "Only CSV files are allowed".to_string(),
        ));
    }
    Ok(())
}

impl ImportsController {
    /// Mount the view and load the history.
    pub fn mount(gateway: Arc<dyn DataGateway>) -> Self {
        let controller = Self {
            gateway,
            state: Arc::new(watch::Sender::new(ImportsState::default())),
        };
        controller.refresh();
        controller
    }

    pub fn refresh(&self) {
        let mut token = None;
        self.state.send_modify(|s| {
            s.history.begin();
            token = Some(s.seq.issue());
        });
        let Some(token) = token else { return };

        debug!(?token, "loading import history");
        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let result = gateway.list_imports().await;
            state.send_if_modified(|s| {
                if !s.seq.is_latest(token) {
                    return false;
                }
                match result {
                    Ok(jobs) => {
                        info!(count = jobs.len(), "import history loaded");
                        s.jobs = Some(jobs);
                        s.history.finish(None);
                    }
                    Err(e) => {
                        warn!(error = %e, "import history failed");
                        s.history.finish(Some(e));
                    }
                }
                true
            });
        });
    }

    /// Validate and upload one CSV export. A successful upload refreshes
    /// the history.
    pub async fn upload(&self, filename: &str, contents: Vec<u8>) -> AppResult<UploadResult> {
        let mut admitted = validate_upload(filename);
        self.state.send_modify(|s| {
            if admitted.is_ok() && s.upload.busy {
                admitted = Err(AppError::Validation(
                    "An upload is already in progress".to_string(),
                ));
            }
            match &admitted {
                Ok(()) => {
                    s.upload.busy = true;
                    s.upload.error = None;
                    s.upload.last_result = None;
                }
                Err(e) => s.upload.error = Some(e.clone()),
            }
        });
        admitted?;
        let busy = BusyGuard(Arc::clone(&self.state));

        info!(filename, bytes = contents.len(), "uploading import");
        let result = self.gateway.upload_import(filename, contents).await;

        self.state.send_modify(|s| {
            s.upload.busy = false;
            match &result {
                Ok(done) => s.upload.last_result = Some(done.clone()),
                Err(e) => s.upload.error = Some(e.clone()),
            }
        });
        drop(busy);

        match &result {
            Ok(done) => {
                info!(id = done.id, status = %done.status, "import finished");
                self.refresh();
            }
            Err(e) => warn!(filename, error = %e, "upload failed"),
        }
        result
    }

    pub fn state(&self) -> ImportsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportsState> {
        self.state.subscribe()
    }
}

impl Drop for ImportsController {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            s.seq.invalidate();
            s.history.loading = false;
        });
    }
}
