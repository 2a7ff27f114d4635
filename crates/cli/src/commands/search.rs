//! Catalog search.

use std::time::Duration;

use grocer_client::SessionError;
use grocer_core::ProductId;

use super::{AppSession, CommandError};

/// Search the catalog and print matching products.
///
/// The query goes through the same debounced controller the screens use,
/// waiting `debounce` before the request is sent.
///
/// # Errors
///
/// Returns an error if not signed in.
pub async fn run(session: &AppSession, query: &str, debounce: Duration) -> Result<(), CommandError> {
    if !session.is_signed_in().await? {
        return Err(SessionError::NotSignedIn.into());
    }

    let search = session.search_controller(debounce);
    search.set_query(query);
    let state = search.settled().await;

    if state.results.is_empty() {
        tracing::info!("No products match '{}'", query.trim());
        return Ok(());
    }
    for product in &state.results {
        tracing::info!(
            "  {} - {} ({})",
            product.id,
            product.name,
            product.unit_price()
        );
    }
    tracing::info!("{} result(s)", state.results.len());
    Ok(())
}

/// Print products recently opened from search.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn recent(session: &AppSession) -> Result<(), CommandError> {
    let recent = session.recent_searches().await?;
    if recent.is_empty() {
        tracing::info!("No recent searches");
        return Ok(());
    }
    for product in &recent {
        tracing::info!("  {} - {}", product.id, product.name);
    }
    Ok(())
}

/// Record that `product` was opened from search.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn open(session: &AppSession, product: &str) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    session.record_recent_search(&product).await?;
    tracing::info!("Added {product} to recent searches");
    Ok(())
}

/// Drop `product` from the recent searches.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn forget(session: &AppSession, product: &str) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    session.remove_recent_search(&product).await?;
    tracing::info!("Removed {product} from recent searches");
    Ok(())
}
