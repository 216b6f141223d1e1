//! Searchable, paginated employee directory.
//!
//! Two events feed the single fetch action:
//!
//! - *settled query changed*: the page is reset to 1, then a fetch is issued
//! - *page changed*: a fetch is issued
//!
//! Both transitions happen inside one state mutation, so no fetch can ever
//! be issued for a new query combined with the page of the old one.
//!
//! Every fetch carries a [`RequestToken`]. A response is applied only if its
//! token is still the newest one issued, so a slow response for an old query
//! cannot overwrite a faster response for a newer one. After a page lands,
//! the selection is reconciled against it and the [`DetailLoader`] follows.

use crate::{
    controllers::{RequestSeq, RequestToken, detail::DetailLoader},
    errors::{AppError, AppResult},
    models::{EmployeeId, EmployeePage, EmployeeQuery, EmployeeSummary, page_count},
    services::{DataGateway, Debouncer},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub page_size: u32,
    pub debounce: Duration,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            page_size: 25,
            debounce: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryState {
    /// Text as typed, updated on every keystroke.
    pub raw_query: String,
    /// Debounced text the current list was requested with.
    pub settled_query: String,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    /// `None` until the first page arrives.
    pub employees: Option<Vec<EmployeeSummary>>,
    pub total: u64,
    pub selected: Option<EmployeeId>,
    pub loading: bool,
    pub error: Option<AppError>,
    seq: RequestSeq,
}

/// A fetch that has been issued and must be run.
#[derive(Debug, Clone)]
pub(crate) struct FetchTicket {
    pub token: RequestToken,
    pub query: EmployeeQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionChange {
    Unchanged,
    Selected(EmployeeId),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Stale,
    Failed,
    Loaded(SelectionChange),
}

impl DirectoryState {
    fn new(page_size: u32) -> Self {
        Self {
            raw_query: String::new(),
            settled_query: String::new(),
            page: 1,
            page_size: page_size.max(1),
            employees: None,
            total: 0,
            selected: None,
            loading: false,
            error: None,
            seq: RequestSeq::default(),
        }
    }

    pub fn page_count(&self) -> u32 {
        page_count(self.total, self.page_size)
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }

    pub fn is_idle(&self) -> bool {
        !self.loading
    }

    pub fn selected_employee(&self) -> Option<&EmployeeSummary> {
        let selected = self.selected?;
        self.employees.as_ref()?.iter().find(|e| e.id == selected)
    }

    pub(crate) fn issue(&mut self) -> FetchTicket {
        self.loading = true;
        FetchTicket {
            token: self.seq.issue(),
            query: EmployeeQuery::new(&self.settled_query, self.page, self.page_size),
        }
    }

    pub(crate) fn settle_query(&mut self, query: String) -> Option<FetchTicket> {
        if query == self.settled_query {
            return None;
        }
        self.settled_query = query;
        self.page = 1;
        Some(self.issue())
    }

    pub(crate) fn go_to_page(&mut self, page: u32) -> Option<FetchTicket> {
        let page = page.max(1);
        if page == self.page {
            return None;
        }
        self.page = page;
        Some(self.issue())
    }

    pub(crate) fn apply(&mut self, token: RequestToken, result: AppResult<EmployeePage>) -> Applied {
        if !self.seq.is_latest(token) {
            return Applied::Stale;
        }
        self.loading = false;

        match result {
            Ok(page) => {
                self.error = None;
                self.total = page.total;
                let change = self.reconcile(&page);
                self.employees = Some(page.items);
                Applied::Loaded(change)
            }
            Err(e) => {
                // Keep the previous list on screen.
                self.error = Some(e);
                Applied::Failed
            }
        }
    }

    /// Keep the selection on the visible page: first row when the previous
    /// selection is missing, nothing when the page is empty.
    fn reconcile(&mut self, page: &EmployeePage) -> SelectionChange {
        let next = match (page.items.first(), self.selected) {
            (None, _) => None,
            (Some(_), Some(id)) if page.contains(id) => Some(id),
            (Some(first), _) => Some(first.id),
        };

        if next == self.selected {
            return SelectionChange::Unchanged;
        }
        self.selected = next;
        match next {
            Some(id) => SelectionChange::Selected(id),
            None => SelectionChange::Cleared,
        }
    }
}

struct Shared {
    gateway: Arc<dyn DataGateway>,
    state: watch::Sender<DirectoryState>,
    detail: DetailLoader,
}

impl Shared {
    /// Run one state transition and start the fetch it issued, if any.
    fn transition(self: &Arc<Self>, step: impl FnOnce(&mut DirectoryState) -> Option<FetchTicket>) {
        let mut ticket = None;
        self.state.send_if_modified(|s| {
            ticket = step(s);
            ticket.is_some()
        });
        if let Some(ticket) = ticket {
            self.spawn_fetch(ticket);
        }
    }

    fn spawn_fetch(self: &Arc<Self>, ticket: FetchTicket) {
        debug!(token = ?ticket.token, query = ?ticket.query, "fetching employee page");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.gateway.list_employees(&ticket.query).await;
            shared.apply(ticket, result);
        });
    }

    fn apply(&self, ticket: FetchTicket, result: AppResult<EmployeePage>) {
        // The detail panel follows inside the same mutation, so a concurrent
        // `select` cannot land between the two.
        let mut applied = Applied::Stale;
        self.state.send_if_modified(|s| {
            applied = s.apply(ticket.token, result);
            if let Applied::Loaded(change) = applied {
                match change {
                    SelectionChange::Selected(id) => self.detail.load(id),
                    SelectionChange::Cleared => self.detail.clear(),
                    SelectionChange::Unchanged => {}
                }
            }
            applied != Applied::Stale
        });

        match applied {
            Applied::Stale => debug!(token = ?ticket.token, "discarding stale employee page"),
            Applied::Failed => {
                let state = self.state.borrow();
                warn!(error = ?state.error, "employee page failed");
            }
            Applied::Loaded(change) => {
                info!(page = ticket.query.page, search = ?ticket.query.search, ?change, "employee page loaded");
            }
        }
    }
}

/// Controller for one mounted employee view. Dropping it tears the view
/// down: pending input is discarded and in-flight responses are ignored.
pub struct DirectoryController {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    listener: JoinHandle<()>,
}

impl DirectoryController {
    /// Mount the view and issue the initial page fetch.
    pub fn mount(gateway: Arc<dyn DataGateway>, settings: DirectorySettings) -> Self {
        let shared = Arc::new(Shared {
            detail: DetailLoader::new(Arc::clone(&gateway)),
            gateway,
            state: watch::Sender::new(DirectoryState::new(settings.page_size)),
        });

        let debouncer = Debouncer::new(settings.debounce);
        let mut settled = debouncer.subscribe();
        let listener_shared = Arc::clone(&shared);
        let listener = tokio::spawn(async move {
            while settled.changed().await.is_ok() {
                let query = settled.borrow_and_update().clone();
                listener_shared.transition(|s| s.settle_query(query));
            }
        });

        shared.transition(|s| Some(s.issue()));

        Self {
            shared,
            debouncer,
            listener,
        }
    }

    /// Record a keystroke. Fetching happens only once the input settles.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.state.send_modify(|s| s.raw_query.clone_from(&text));
        self.debouncer.push(text);
    }

    /// Jump to `page` (values below 1 mean page 1).
    pub fn set_page(&self, page: u32) {
        self.shared.transition(|s| s.go_to_page(page));
    }

    /// No-op on the last page.
    pub fn next_page(&self) {
        self.shared.transition(|s| {
            if s.has_next_page() {
                let next = s.page + 1;
                s.go_to_page(next)
            } else {
                None
            }
        });
    }

    /// No-op on page 1.
    pub fn prev_page(&self) {
        self.shared.transition(|s| {
            if s.has_prev_page() {
                let prev = s.page - 1;
                s.go_to_page(prev)
            } else {
                None
            }
        });
    }

    /// Select an employee and load its payroll history. Re-selecting the
    /// current employee does nothing; use `detail().reload()` to retry a
    /// failed history.
    pub fn select(&self, employee_id: EmployeeId) {
        self.shared.state.send_if_modified(|s| {
            if s.selected == Some(employee_id) {
                return false;
            }
            s.selected = Some(employee_id);
            self.shared.detail.load(employee_id);
            true
        });
    }

    /// Re-issue the fetch for the current page and settled query.
    pub fn refresh(&self) {
        self.shared.transition(|s| Some(s.issue()));
    }

    pub fn state(&self) -> DirectoryState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DirectoryState> {
        self.shared.state.subscribe()
    }

    pub fn detail(&self) -> &DetailLoader {
        &self.shared.detail
    }
}

impl Drop for DirectoryController {
    fn drop(&mut self) {
        self.listener.abort();
        self.debouncer.cancel();
        self.shared.state.send_modify(|s| {
            s.seq.invalidate();
            s.loading = false;
        });
        self.shared.detail.clear();
    }
}
