//! Search-as-you-type with debouncing.
//!
//! Each call to [`SearchController::set_query`] cancels the pending search
//! and schedules a new one after the debounce interval. Only the latest
//! query may publish results; a response that lost the race is dropped even
//! if it arrives after its task was aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::api::{ProductSummary, StorefrontApi};
use crate::storage::{KeyValueStore, read_token};

/// State published to the search screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Text as typed.
    pub query: String,
    /// Results of the latest completed search.
    pub results: Vec<ProductSummary>,
    /// Whether a search for `query` is scheduled or running.
    pub in_flight: bool,
}

/// Debounced catalog search.
///
/// Must be used inside a Tokio runtime. Dropping the controller cancels the
/// pending search.
pub struct SearchController<A, S> {
    inner: Arc<Inner<A, S>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<A, S> {
    api: Arc<A>,
    storage: Arc<S>,
    debounce: Duration,
    tx: watch::Sender<SearchState>,
    generation: AtomicU64,
}

impl<A, S> SearchController<A, S>
where
    A: StorefrontApi + 'static,
    S: KeyValueStore + 'static,
{
    /// Create a controller that waits `debounce` after the last keystroke.
    pub fn new(api: Arc<A>, storage: Arc<S>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                storage,
                debounce,
                tx: watch::channel(SearchState::default()).0,
                generation: AtomicU64::new(0),
            }),
            pending: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> SearchState {
        self.inner.tx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.tx.subscribe()
    }

    /// Record new input and reschedule the search.
    ///
    /// Blank input clears the results immediately and sends nothing.
    pub fn set_query(&self, text: &str) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let query = text.trim().to_owned();
        if query.is_empty() {
            self.inner.tx.send_modify(|state| {
                state.query = text.to_owned();
                state.results.clear();
                state.in_flight = false;
            });
            return;
        }

        self.inner.tx.send_modify(|state| {
            state.query = text.to_owned();
            state.in_flight = true;
        });
        let inner = Arc::clone(&self.inner);
        *pending = Some(tokio::spawn(async move {
            inner.run(generation, query).await;
        }));
    }

    /// Wait until no search is pending and return the settled state.
    pub async fn settled(&self) -> SearchState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|state| !state.in_flight).await;
        settled.map_or_else(|_| self.state(), |state| state.clone())
    }
}

impl<A, S> Drop for SearchController<A, S> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

impl<A, S> Inner<A, S>
where
    A: StorefrontApi,
    S: KeyValueStore,
{
    #[instrument(skip_all, fields(query = %query, generation = generation))]
    async fn run(&self, generation: u64, query: String) {
        tokio::time::sleep(self.debounce).await;

        let results = match read_token(self.storage.as_ref()).await {
            Ok(Some(token)) => match self.api.search(&token, &query).await {
                Ok(results) => Some(results),
                Err(e) => {
                    error!(error = %e, "Search failed");
                    None
                }
            },
            Ok(None) => {
                warn!("Search requires a signed-in user");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to read token for search");
                None
            }
        };

        let published = self.tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.in_flight = false;
            if let Some(results) = results {
                state.results = results;
            }
            true
        });
        if published {
            debug!("Search settled");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, TOKEN};
    use crate::config::DEFAULT_SEARCH_DEBOUNCE;
    use crate::storage::{MemoryStore, TOKEN_KEY};

    fn controller(storage: MemoryStore) -> (Arc<FakeApi>, SearchController<FakeApi, MemoryStore>) {
        let api = Arc::new(FakeApi::new());
        let controller = SearchController::new(
            api.clone(),
            Arc::new(storage),
            DEFAULT_SEARCH_DEBOUNCE,
        );
        (api, controller)
    }

    fn signed_in() -> (Arc<FakeApi>, SearchController<FakeApi, MemoryStore>) {
        controller(MemoryStore::with_entries([(TOKEN_KEY, TOKEN)]))
    }

    fn names(state: &SearchState) -> Vec<&str> {
        state.results.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_sends_one_request() {
        let (api, search) = signed_in();

        search.set_query("b");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.set_query("ba");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.set_query("banana");
        assert!(search.state().in_flight);

        let state = search.settled().await;
        assert_eq!(api.calls("search"), 1);
        assert_eq!(state.query, "banana");
        assert_eq!(names(&state), ["Banana prata"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_debounce() {
        let (api, search) = signed_in();
        search.set_query("arroz");

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(api.calls("search"), 0);

        search.settled().await;
        assert_eq!(api.calls("search"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_results() {
        let (api, search) = signed_in();
        search.set_query("feij");
        assert_eq!(search.settled().await.results.len(), 1);

        search.set_query("   ");
        let state = search.state();
        assert!(state.results.is_empty());
        assert!(!state.in_flight);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.calls("search"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_cancels_pending_search() {
        let (api, search) = signed_in();
        search.set_query("arroz");
        search.set_query("");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.calls("search"), 0);
        assert!(search.state().results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_keeps_previous_results() {
        let (api, search) = signed_in();
        search.set_query("arroz");
        search.settled().await;

        api.fail("search", true);
        search.set_query("arroz integral");
        let state = search.settled().await;
        assert!(!state.in_flight);
        assert_eq!(names(&state), ["Arroz integral 1kg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_out_search_sends_nothing() {
        let (api, search) = controller(MemoryStore::new());
        search.set_query("arroz");

        let state = search.settled().await;
        assert!(state.results.is_empty());
        assert_eq!(api.calls("search"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_search() {
        let (api, search) = signed_in();
        search.set_query("arroz");
        drop(search);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.calls("search"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_for_old_query_is_dropped() {
        let (api, search) = signed_in();
        api.delay("search", Duration::from_millis(500));
        search.set_query("arroz");

        // Let the first search reach the API before superseding it.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(api.calls("search"), 1);
        api.delay("search", Duration::ZERO);
        search.set_query("banana");

        let state = search.settled().await;
        assert_eq!(names(&state), ["Banana prata"]);
    }
}
