//! Incremental page loading with a single in-flight request per list.
//!
//! A [`PaginatedList`] accumulates pages fetched from a [`PageSource`]. Each
//! distinct [`ListQuery`] is a session: the offset only moves forward inside a
//! session, and switching the query starts a fresh one from offset zero.

use crate::error::ShelfError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Server-side filter sent with every page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Build a query, treating blank strings as "no filter".
    pub fn new(category: Option<&str>, search: Option<&str>) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            category: clean(category),
            search: clean(search),
        }
    }
}

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub query: ListQuery,
}

/// One page response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// What the server claims; [`PaginatedList`] derives its own flag from
    /// `total` and logs disagreements.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A complete list delivered as a single page.
    pub fn whole(items: Vec<T>) -> Self {
        let total = items.len();
        Self {
            items,
            total,
            has_more: false,
        }
    }
}

/// The external list API.
pub trait PageSource<T> {
    /// Fetch the slice described by `request`.
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Page<T>, ShelfError>> + Send;
}

/// Pagination bookkeeping of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Offset of the most recently loaded page.
    pub offset: usize,
    pub limit: usize,
    /// Total reported by the last page.
    pub total: usize,
    pub has_more: bool,
    /// Items accumulated so far in this session.
    pub loaded: usize,
}

impl PaginationState {
    fn fresh(limit: usize) -> Self {
        Self {
            limit,
            has_more: true,
            ..Self::default()
        }
    }

    /// Items the server still holds beyond what is loaded.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.loaded)
    }

    /// Whether a "load more" control is worth showing.
    pub fn shows_load_more(&self) -> bool {
        self.has_more && self.total > self.limit
    }
}

/// Result of [`PaginatedList::load_next_page`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// A page was appended.
    Loaded { appended: usize, has_more: bool },
    /// Another request for this list is in flight; nothing was sent.
    Busy,
    /// The session has no further pages; nothing was sent.
    Exhausted,
    /// The session was reset while the request was in flight; the response
    /// was dropped.
    Discarded,
    /// The request failed; state is unchanged so the call can be retried.
    Failed(ShelfError),
}

struct Session<T> {
    id: u64,
    query: ListQuery,
    items: Vec<T>,
    state: PaginationState,
    started: bool,
}

impl<T> Session<T> {
    fn restart(&mut self, query: ListQuery, limit: usize) {
        self.id = self.id.wrapping_add(1);
        self.query = query;
        self.items.clear();
        self.state = PaginationState::fresh(limit);
        self.started = false;
    }
}

/// Clears the in-flight flag when dropped, including when the load future is
/// cancelled mid-request.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Accumulated, incrementally loaded list backed by a [`PageSource`].
pub struct PaginatedList<T, S> {
    name: String,
    source: S,
    limit: usize,
    session: Mutex<Session<T>>,
    in_flight: AtomicBool,
}

impl<T, S> PaginatedList<T, S>
where
    T: Clone,
    S: PageSource<T>,
{
    /// Create an empty list named `name` (used in logs) fetching `limit`
    /// items per page. A zero limit is bumped to one.
    pub fn new(name: impl Into<String>, source: S, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            name: name.into(),
            source,
            limit,
            session: Mutex::new(Session {
                id: 0,
                query: ListQuery::default(),
                items: Vec::new(),
                state: PaginationState::fresh(limit),
                started: false,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session<T>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and append the next page for `query`.
    ///
    /// A query different from the current session's starts a new session
    /// once its first page arrives. Failures are logged and reported as [`LoadOutcome::Failed`] with the
    /// accumulated state untouched.
    pub async fn load_next_page(&self, query: &ListQuery) -> LoadOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(list = %self.name, "page request already in flight");
            return LoadOutcome::Busy;
        };

        let (request, session_id, restart) = {
            let session = self.session();
            let restart = session.query != *query;
            if !restart && session.started && !session.state.has_more {
                return LoadOutcome::Exhausted;
            }
            let offset = if restart { 0 } else { session.state.loaded };
            let request = PageRequest {
                offset,
                limit: self.limit,
                query: query.clone(),
            };
            (request, session.id, restart)
        };

        let page = match self.source.fetch_page(&request).await {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    list = %self.name,
                    offset = request.offset,
                    error = %err,
                    "page load failed"
                );
                return LoadOutcome::Failed(err);
            }
        };

        let mut session = self.session();
        if session.id != session_id {
            debug!(list = %self.name, "dropping page for superseded session");
            return LoadOutcome::Discarded;
        }
        if restart {
            debug!(list = %self.name, ?query, "filter changed; starting new session");
            session.restart(request.query.clone(), self.limit);
        }

        let appended = page.items.len();
        let end = request.offset + appended;
        let has_more = appended > 0 && end < page.total;
        if has_more != page.has_more {
            debug!(
                list = %self.name,
                server_has_more = page.has_more,
                has_more,
                end,
                total = page.total,
                "server has_more disagrees with total"
            );
        }

        session.items.extend(page.items);
        session.started = true;
        session.state = PaginationState {
            offset: request.offset,
            limit: self.limit,
            total: page.total,
            has_more,
            loaded: session.state.loaded + appended,
        };
        debug!(
            list = %self.name,
            offset = request.offset,
            appended,
            total = page.total,
            has_more,
            "page loaded"
        );
        LoadOutcome::Loaded { appended, has_more }
    }

    /// Load pages until the session is exhausted or `max_pages` were fetched.
    ///
    /// # Returns
    /// The last non-`Loaded` outcome, or the final `Loaded` one.
    pub async fn load_pages(&self, query: &ListQuery, max_pages: usize) -> LoadOutcome {
        let mut last = LoadOutcome::Exhausted;
        for _ in 0..max_pages {
            last = self.load_next_page(query).await;
            match last {
                LoadOutcome::Loaded { has_more: true, .. } => continue,
                _ => break,
            }
        }
        last
    }

    /// Start a new session with the current query (a refresh).
    pub fn reset(&self) {
        let mut session = self.session();
        let query = session.query.clone();
        session.restart(query, self.limit);
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PaginationState {
        self.session().state
    }

    pub fn query(&self) -> ListQuery {
        self.session().query.clone()
    }

    /// Identifier that changes whenever a new session starts.
    pub fn session_id(&self) -> u64 {
        self.session().id
    }

    pub fn len(&self) -> usize {
        self.session().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the accumulated items without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.session().items)
    }

    pub fn items(&self) -> Vec<T> {
        self.session().items.clone()
    }
}
