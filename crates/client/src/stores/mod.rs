//! Reactive client-side state stores.
//!
//! Each store owns one slice of state and publishes it through a
//! [`tokio::sync::watch`] channel. Subscribers see every committed value;
//! nothing is published for a mutation that failed.
//!
//! - [`CartStore`] caches the server-computed cart aggregate.
//! - [`FavoritesStore`] tracks favorited products with a local mirror and
//!   hydrates from the server at most once per session.
//! - [`ThemeStore`] holds the dark-mode flag, written through to storage.

mod cart;
mod favorites;
mod theme;

pub use cart::CartStore;
pub use favorites::{FavoritesState, FavoritesStore};
pub use theme::ThemeStore;

/// Outcome of a best-effort refresh.
///
/// Refreshes never fail loudly: errors are logged and the previous state is
/// kept. The outcome lets callers that care tell the cases apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// New state was committed.
    Applied,
    /// Nothing was requested (already hydrated, or not signed in).
    Skipped,
    /// The response arrived after a newer value had been committed.
    Discarded,
    /// The request or storage read failed; previous state kept.
    Failed,
}

impl Refresh {
    /// Whether new state was committed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
