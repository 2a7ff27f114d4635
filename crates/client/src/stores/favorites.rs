//! Favorites store.
//!
//! The store never calls the favorite mutation endpoints itself. Callers
//! confirm a change with the server first and only then flip local state
//! (see [`Session::toggle_favorite`](crate::Session::toggle_favorite)), so
//! memory only ever reflects server-accepted changes.
//!
//! Local state is mirrored under the `favorites` key as a presence map
//! (`{"<id>": true}`). Mutations write the mirror before touching memory; a
//! failed write is returned to the caller and memory stays as it was.
//!
//! A hydration response is a snapshot taken when the server answered. Any
//! mutation committed while it was in flight is replayed on top of it, so a
//! change the server already confirmed is never rolled back by an older list.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use grocer_core::ProductId;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, instrument, warn};

use super::Refresh;
use crate::api::StorefrontApi;
use crate::error::StoreError;
use crate::storage::{FAVORITES_KEY, KeyValueStore, read_json, read_token, write_json};

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesState {
    /// Favorited product IDs.
    pub ids: BTreeSet<ProductId>,
    /// Whether the set has been hydrated from the server this session.
    pub loaded: bool,
}

/// Mutations committed since the last hydration or clear.
#[derive(Debug, Default)]
struct Edits {
    /// Bumped on every committed mutation.
    revision: u64,
    /// Latest committed membership per product, tagged with its revision.
    latest: BTreeMap<ProductId, (u64, bool)>,
}

impl Edits {
    fn record(&mut self, product: &ProductId, favorite: bool) {
        self.revision += 1;
        self.latest.insert(product.clone(), (self.revision, favorite));
    }

    /// Apply changes committed after `since` to `ids`; returns how many.
    fn replay(&self, since: u64, ids: &mut BTreeSet<ProductId>) -> usize {
        let mut replayed = 0;
        for (product, &(revision, favorite)) in &self.latest {
            if revision <= since {
                continue;
            }
            if favorite {
                ids.insert(product.clone());
            } else {
                ids.remove(product);
            }
            replayed += 1;
        }
        replayed
    }
}

/// Favorited products, hydrated from the server at most once per session.
pub struct FavoritesStore<A, S> {
    api: Arc<A>,
    storage: Arc<S>,
    tx: watch::Sender<FavoritesState>,
    /// Serializes mutations so the mirror and memory change in the same order.
    edits: Mutex<Edits>,
    /// Bumped by `clear_favorites`; reads started before a clear are dropped.
    epoch: AtomicU64,
}

impl<A, S> FavoritesStore<A, S>
where
    A: StorefrontApi,
    S: KeyValueStore,
{
    /// Create an empty, unhydrated store.
    pub fn new(api: Arc<A>, storage: Arc<S>) -> Self {
        Self {
            api,
            storage,
            tx: watch::channel(FavoritesState::default()).0,
            edits: Mutex::new(Edits::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Whether `product` is currently favorited.
    pub fn is_favorite(&self, product: &ProductId) -> bool {
        self.tx.borrow().ids.contains(product)
    }

    /// Current favorited IDs.
    pub fn favorites(&self) -> BTreeSet<ProductId> {
        self.tx.borrow().ids.clone()
    }

    /// Whether server hydration has completed since the last clear.
    pub fn is_loaded(&self) -> bool {
        self.tx.borrow().loaded
    }

    /// Receiver notified on every committed change.
    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.tx.subscribe()
    }

    /// Set membership of `product` explicitly.
    ///
    /// Returns the resulting membership. Setting the current value writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the mirror cannot be written; memory
    /// is unchanged in that case.
    #[instrument(skip_all, fields(product = %product, favorite = favorite))]
    pub async fn set_favorite(&self, product: &ProductId, favorite: bool) -> Result<bool, StoreError> {
        let mut edits = self.edits.lock().await;
        self.apply(&mut edits, product, favorite).await
    }

    /// Flip membership of `product` and return the new membership.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the mirror cannot be written; memory
    /// is unchanged in that case.
    #[instrument(skip_all, fields(product = %product))]
    pub async fn toggle_favorite(&self, product: &ProductId) -> Result<bool, StoreError> {
        let mut edits = self.edits.lock().await;
        let favorite = !self.is_favorite(product);
        self.apply(&mut edits, product, favorite).await
    }

    async fn apply(
        &self,
        edits: &mut Edits,
        product: &ProductId,
        favorite: bool,
    ) -> Result<bool, StoreError> {
        let mut next = self.favorites();
        let changed = if favorite {
            next.insert(product.clone())
        } else {
            next.remove(product)
        };
        if !changed {
            // Recorded anyway so an in-flight hydration replays it.
            edits.record(product, favorite);
            return Ok(favorite);
        }

        self.write_mirror(&next).await?;
        edits.record(product, favorite);
        self.tx.send_modify(|state| state.ids = next);
        debug!(favorite, "Favorite updated");
        Ok(favorite)
    }

    /// Hydrate from the server unless already hydrated or signed out.
    ///
    /// Safe to call on every screen focus. A failed hydration leaves the
    /// store unhydrated so the next call retries.
    #[instrument(skip_all)]
    pub async fn fetch_favorites(&self) -> Refresh {
        if self.is_loaded() {
            return Refresh::Skipped;
        }
        let token = match read_token(self.storage.as_ref()).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No token stored, skipping favorites hydration");
                return Refresh::Skipped;
            }
            Err(e) => {
                error!(error = %e, "Failed to read token for favorites hydration");
                return Refresh::Failed;
            }
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let since = self.edits.lock().await.revision;
        let products = match self.api.favorites(&token).await {
            Ok(products) => products,
            Err(e) => {
                error!(error = %e, "Failed to fetch favorites");
                return Refresh::Failed;
            }
        };
        let mut ids: BTreeSet<ProductId> = products.into_iter().map(|p| p.id).collect();

        let mut edits = self.edits.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Favorites cleared during hydration, dropping response");
            return Refresh::Discarded;
        }
        if self.is_loaded() {
            return Refresh::Skipped;
        }
        let replayed = edits.replay(since, &mut ids);
        if replayed > 0 {
            debug!(replayed, "Replayed favorites changed during hydration");
        }
        edits.latest.clear();
        // Mirror is best effort here; memory already matches the server.
        if let Err(e) = self.write_mirror(&ids).await {
            warn!(error = %e, "Failed to mirror hydrated favorites");
        }
        debug!(count = ids.len(), "Favorites hydrated");
        self.tx.send_replace(FavoritesState { ids, loaded: true });
        Refresh::Applied
    }

    /// Reset to the empty, unhydrated state.
    ///
    /// Called on logout so the next account hydrates from its own server
    /// data. The local mirror is left alone; the session removes it.
    pub async fn clear_favorites(&self) {
        let mut edits = self.edits.lock().await;
        edits.latest.clear();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(FavoritesState::default());
    }

    /// Show the local mirror before the server answers.
    ///
    /// Does not mark the store hydrated, and does nothing once it is. A
    /// clear that lands while the mirror is being read wins over the mirror.
    #[instrument(skip_all)]
    pub async fn restore_cached(&self) -> Refresh {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let since = self.edits.lock().await.revision;
        let cached = read_json::<_, BTreeMap<String, bool>>(self.storage.as_ref(), FAVORITES_KEY);
        let mirror = match cached.await {
            Ok(Some(mirror)) => mirror,
            Ok(None) => return Refresh::Skipped,
            Err(e) => {
                warn!(error = %e, "Failed to read favorites mirror");
                return Refresh::Failed;
            }
        };

        let edits = self.edits.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Favorites cleared while reading the mirror, dropping it");
            return Refresh::Discarded;
        }
        if self.is_loaded() {
            return Refresh::Skipped;
        }
        let mut ids: BTreeSet<ProductId> = mirror
            .into_iter()
            .filter_map(|(id, present)| present.then(|| ProductId::new(id)))
            .collect();
        edits.replay(since, &mut ids);
        debug!(count = ids.len(), "Restored cached favorites");
        self.tx.send_modify(|state| state.ids = ids);
        Refresh::Applied
    }

    async fn write_mirror(&self, ids: &BTreeSet<ProductId>) -> Result<(), StoreError> {
        let mirror: BTreeMap<&str, bool> = ids.iter().map(|id| (id.as_str(), true)).collect();
        write_json(self.storage.as_ref(), FAVORITES_KEY, &mirror).await?;
        Ok(())
    }
}
