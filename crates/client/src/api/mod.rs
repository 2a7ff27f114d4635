//! Storefront REST API contract and its HTTP implementation.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | register | `POST /users/register` `{fullName, email, password}` |
//! | login | `POST /users/login` `{email, password}` → `{token}` |
//! | cart aggregate | `GET /users/cart/info` → `{itemCount, totalValue}` |
//! | cart lines | `GET /users/cart` → `{productIds: [{productId, quantity}]}` |
//! | add to cart | `PUT /users/cart/:id` `{productId, quantity}` → aggregate |
//! | set quantity | `PUT /users/cart/:id/quantity` `{quantity}` |
//! | remove line | `DELETE /users/cart/:id` |
//! | empty cart | `DELETE /users/cart/clear` |
//! | favorites | `GET /users/favorites` → `[{_id, ...}]` |
//! | favorite / unfavorite | `PUT` / `DELETE /users/favorites/:id` `{productId}` |
//! | profile | `GET /users/user`, `PUT /users/update` |
//! | search | `GET /users/search?query=` → `[{_id, ...}]` |
//! | recent searches | `GET /users/recent-searches`, `PUT` / `DELETE /users/recent-searches/:id` |
//!
//! Authenticated calls send `Authorization: Bearer <token>`. The API owns
//! pricing, stock and cart math; the client never recomputes them.

mod cache;
mod http;
pub mod types;

use std::future::Future;
use std::time::Duration;

use grocer_core::{CartAggregate, Email, ProductId};
use secrecy::SecretString;
use thiserror::Error;

pub use http::HttpApi;
pub use types::{CartContents, CartLine, ProductSummary, ProfileUpdate, UserProfile};

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request was aborted after its deadline.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The token was rejected (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the raw body prefix.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The configured base URL cannot carry path segments.
    #[error("Invalid API base URL: {0}")]
    BaseUrl(String),
}

impl ApiError {
    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Unauthorized | Self::Decode(_) | Self::BaseUrl(_) => false,
        }
    }
}

/// The remote storefront API as seen by the stores.
///
/// Implementations enforce their own deadlines: favorite and add-to-cart
/// mutations have short timeouts and must abort the underlying request when
/// the deadline passes.
pub trait StorefrontApi: Send + Sync {
    /// Create an account. Does not sign in.
    fn register(
        &self,
        full_name: &str,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Exchange credentials for a bearer token.
    fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<SecretString, ApiError>> + Send;

    /// Fetch the cart aggregate.
    fn cart_info(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<CartAggregate, ApiError>> + Send;

    /// Add `quantity` units of a product; returns the new aggregate.
    fn add_to_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartAggregate, ApiError>> + Send;

    /// Fetch the cart with its line items.
    fn cart(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<CartContents, ApiError>> + Send;

    /// Set the quantity of a product already in the cart.
    fn set_cart_quantity(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove a product's line from the cart.
    fn remove_from_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove every line from the cart.
    fn clear_cart(&self, token: &SecretString)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch every product the user has favorited.
    fn favorites(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<ProductSummary>, ApiError>> + Send;

    /// Mark a product as favorite on the server.
    fn add_favorite(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove a product from the server-side favorites.
    fn remove_favorite(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Fetch the signed-in user's profile.
    fn user(&self, token: &SecretString)
    -> impl Future<Output = Result<UserProfile, ApiError>> + Send;

    /// Apply a partial profile update.
    fn update_user(
        &self,
        token: &SecretString,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Search the catalog.
    fn search(
        &self,
        token: &SecretString,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ProductSummary>, ApiError>> + Send;

    /// Products the user recently opened from search, newest first.
    fn recent_searches(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<ProductSummary>, ApiError>> + Send;

    /// Record that the user opened `product` from search.
    fn add_recent_search(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Drop `product` from the recent searches.
    fn remove_recent_search(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[cfg(test)]
pub(crate) mod fake;
