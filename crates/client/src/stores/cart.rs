//! Cart aggregate store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use grocer_core::CartAggregate;
use tokio::sync::watch;
use tracing::{debug, error, instrument};

use super::Refresh;
use crate::api::StorefrontApi;
use crate::storage::{KeyValueStore, read_token};

/// In-memory cache of the server-computed cart aggregate.
///
/// The aggregate is only ever replaced wholesale. Every assignment and every
/// fetch takes a sequence number when it starts; a fetch response is
/// dropped if a later assignment or fetch has already been committed, so
/// out-of-order responses cannot roll the cart back.
pub struct CartStore<A, S> {
    api: Arc<A>,
    storage: Arc<S>,
    tx: watch::Sender<CartAggregate>,
    dispatched: AtomicU64,
    applied: Mutex<u64>,
}

impl<A, S> CartStore<A, S>
where
    A: StorefrontApi,
    S: KeyValueStore,
{
    /// Create a store holding the empty aggregate.
    pub fn new(api: Arc<A>, storage: Arc<S>) -> Self {
        Self {
            api,
            storage,
            tx: watch::channel(CartAggregate::empty()).0,
            dispatched: AtomicU64::new(0),
            applied: Mutex::new(0),
        }
    }

    /// Current aggregate.
    pub fn cart_info(&self) -> CartAggregate {
        *self.tx.borrow()
    }

    /// Receiver notified on every committed aggregate.
    pub fn subscribe(&self) -> watch::Receiver<CartAggregate> {
        self.tx.subscribe()
    }

    /// Replace the aggregate unconditionally.
    ///
    /// Used by callers that already hold a fresher aggregate, such as the
    /// response of an add-to-cart call. Fetches still in flight when this is
    /// called are superseded.
    pub fn set_cart_info(&self, aggregate: CartAggregate) {
        let seq = self.next_seq();
        self.commit(seq, aggregate);
    }

    /// Refresh the aggregate from the server.
    ///
    /// Without a stored token no request is made. Failures are logged and
    /// leave the previous aggregate in place.
    #[instrument(skip_all)]
    pub async fn fetch_cart_info(&self) -> Refresh {
        let token = match read_token(self.storage.as_ref()).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No token stored, skipping cart refresh");
                return Refresh::Skipped;
            }
            Err(e) => {
                error!(error = %e, "Failed to read token for cart refresh");
                return Refresh::Failed;
            }
        };

        let seq = self.next_seq();
        match self.api.cart_info(&token).await {
            Ok(aggregate) => {
                if self.commit(seq, aggregate) {
                    debug!(
                        item_count = aggregate.item_count,
                        total_value = %aggregate.total_value,
                        "Cart refreshed"
                    );
                    Refresh::Applied
                } else {
                    debug!(seq, "Discarding superseded cart response");
                    Refresh::Discarded
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch cart info");
                Refresh::Failed
            }
        }
    }

    fn next_seq(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `aggregate` unless something newer than `seq` is already live.
    fn commit(&self, seq: u64, aggregate: CartAggregate) -> bool {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if seq < *applied {
            return false;
        }
        *applied = seq;
        self.tx.send_replace(aggregate);
        true
    }
}
