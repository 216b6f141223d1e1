// src/controllers/mod.rs
//
// View controllers. Each owns its state in a `watch` channel: mutations are
// synchronous and never span an `.await`, and every mutation wakes the
// subscribed render layer. Fetches run in spawned tasks and carry a request
// token; only the most recently issued token may write its result back.

pub mod dashboard;
pub mod detail;
pub mod directory;
pub mod imports;

use crate::errors::AppError;

pub use dashboard::{DashboardOrchestrator, DashboardState, DashboardView, PeriodPanel};
pub use detail::{DetailLoader, DetailState};
pub use directory::{DirectoryController, DirectorySettings, DirectoryState};
pub use imports::{ImportsController, ImportsState, UploadState};

/// Identity of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Monotonic request counter for one independently triggered fetch.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestSeq {
    latest: u64,
}

impl RequestSeq {
    pub(crate) fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    pub(crate) fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Make every in-flight request stale.
    pub(crate) fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Loading flag and error slot of one fetch phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseStatus {
    pub loading: bool,
    pub error: Option<AppError>,
}

impl PhaseStatus {
    fn begin(&mut self) {
        self.loading = true;
    }

    fn finish(&mut self, error: Option<AppError>) {
        self.loading = false;
        self.error = error;
    }
}
