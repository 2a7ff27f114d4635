//! Cart commands.

use grocer_core::ProductId;

use super::{AppSession, CommandError};

/// Print the cart aggregate refreshed during startup.
pub fn show(session: &AppSession) {
    let cart = session.cart().cart_info();
    if cart.is_empty() {
        tracing::info!("Cart is empty");
    } else {
        tracing::info!("Cart: {} item(s), {}", cart.item_count, cart.total());
    }
}

/// Add `quantity` units of `product`.
///
/// # Errors
///
/// Returns an error if not signed in, the quantity is zero, or the API
/// rejects the request.
pub async fn add(session: &AppSession, product: &str, quantity: u32) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    let cart = session.add_to_cart(&product, quantity).await?;
    tracing::info!(
        "Added {quantity} x {product}. Cart: {} item(s), {}",
        cart.item_count,
        cart.total()
    );
    Ok(())
}

/// Print every cart line with its subtotal.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn list(session: &AppSession) -> Result<(), CommandError> {
    let contents = session.cart_lines().await?;
    if contents.is_empty() {
        tracing::info!("Cart is empty");
        return Ok(());
    }
    for line in &contents.lines {
        tracing::info!(
            "  {} - {} x {} = {}",
            line.product.id,
            line.quantity,
            line.product.name,
            line.line_total()
        );
    }
    show(session);
    Ok(())
}

/// Set the units of a product already in the cart.
///
/// # Errors
///
/// Returns an error if not signed in, the quantity is zero, or the product
/// is not in the cart.
pub async fn quantity(session: &AppSession, product: &str, quantity: u32) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    let cart = session.set_quantity(&product, quantity).await?;
    tracing::info!(
        "{product} set to {quantity}. Cart: {} item(s), {}",
        cart.item_count,
        cart.total()
    );
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns an error if not signed in or the product is not in the cart.
pub async fn remove(session: &AppSession, product: &str) -> Result<(), CommandError> {
    let product = ProductId::new(product);
    let cart = session.remove_from_cart(&product).await?;
    tracing::info!(
        "Removed {product}. Cart: {} item(s), {}",
        cart.item_count,
        cart.total()
    );
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if not signed in or the request fails.
pub async fn clear(session: &AppSession) -> Result<(), CommandError> {
    session.clear_cart().await?;
    tracing::info!("Cart emptied");
    Ok(())
}
