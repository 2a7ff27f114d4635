//! Favorites commands.

use grocer_client::Refresh;
use grocer_core::ProductId;

use super::{AppSession, CommandError};

/// Print favorited product IDs.
pub fn list(session: &AppSession) {
    let favorites = session.favorites().favorites();
    if favorites.is_empty() {
        tracing::info!("No favorites");
        return;
    }
    if !session.favorites().is_loaded() {
        tracing::warn!("Showing cached favorites; the server could not be reached");
    }
    for id in &favorites {
        tracing::info!("  {id}");
    }
    tracing::info!("{} favorite(s)", favorites.len());
}

/// Favorite or unfavorite `product` on the server, then locally.
///
/// # Errors
///
/// Returns an error if not signed in, the server call fails, or the local
/// mirror cannot be written.
pub async fn toggle(session: &AppSession, product: &str) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    if session.toggle_favorite(&product).await? {
        tracing::info!("Added {product} to favorites");
    } else {
        tracing::info!("Removed {product} from favorites");
    }
    Ok(())
}

/// Re-hydrate favorites from the server.
pub async fn sync(session: &AppSession) {
    session.favorites().clear_favorites().await;
    match session.favorites().fetch_favorites().await {
        Refresh::Applied => tracing::info!(
            "Synced {} favorite(s)",
            session.favorites().favorites().len()
        ),
        Refresh::Skipped => tracing::warn!("Not signed in; nothing to sync"),
        Refresh::Discarded | Refresh::Failed => tracing::warn!("Favorites sync failed"),
    }
}
