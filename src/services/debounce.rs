//! Keystroke debouncing for search input.
//!
//! [`Debouncer`] keeps a single pending timer. Every [`push`](Debouncer::push)
//! aborts the pending timer and starts a new one, so only the last value typed
//! inside the quiet window is ever published. Published values are exposed as
//! a `watch` channel; publishing a value equal to the current settled value is
//! suppressed, so subscribers see each real change exactly once.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::trace;

pub struct Debouncer {
    quiet: Duration,
    settled: Arc<watch::Sender<String>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            settled: Arc::new(watch::Sender::new(String::new())),
            pending: Mutex::new(None),
        }
    }

    /// Feed one raw input event. Must be called from within a tokio runtime.
    pub fn push(&self, raw: impl Into<String>) {
        let raw = raw.into();
        let settled = Arc::clone(&self.settled);
        let quiet = self.quiet;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            settled.send_if_modified(|current| {
                if *current == raw {
                    return false;
                }
                trace!(query = %raw, "query settled");
                *current = raw;
                true
            });
        });

        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }

    /// The last published value.
    pub fn settled(&self) -> String {
        self.settled.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.settled.subscribe()
    }

    /// Drop any pending input without publishing it.
    pub fn cancel(&self) {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
