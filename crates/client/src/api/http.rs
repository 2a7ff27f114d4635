//! `reqwest` implementation of [`StorefrontApi`].
//!
//! Deadlines are set per request with `RequestBuilder::timeout`, so an
//! expired call drops its connection instead of lingering in the background
//! where it could still mutate server state.

use std::sync::Arc;
use std::time::Duration;

use grocer_core::{CartAggregate, Email, ProductId};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::cache::SearchCache;
use super::types::{
    AddToCartRequest, CartContents, ErrorBody, FavoriteRequest, LoginRequest, LoginResponse,
    ProductSummary, ProfileUpdate, QuantityRequest, RegisterRequest, UserProfile,
};
use super::{ApiError, StorefrontApi};
use crate::config::{ClientConfig, Timeouts};

/// Longest body prefix copied into logs and error messages.
const BODY_PREVIEW: usize = 200;

/// HTTP client for the storefront REST API.
///
/// Cheap to clone; clones share the connection pool and search cache.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    base_url: Url,
    timeouts: Timeouts,
    search_cache: SearchCache,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeouts", &self.inner.timeouts)
            .finish_non_exhaustive()
    }
}

impl HttpApi {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeouts.request)
            .user_agent(concat!("grocer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client,
                base_url: config.api_base_url.clone(),
                timeouts: config.timeouts,
                search_cache: SearchCache::new(),
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Drop cached search results (e.g. after logout).
    pub fn clear_cache(&self) {
        self.inner.search_cache.clear();
    }

    /// Resolve `segments` below the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::BaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&SecretString>,
        timeout: Duration,
    ) -> RequestBuilder {
        let builder = self.inner.client.request(method, url).timeout(timeout);
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let body = self.send(builder, timeout).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %preview(&body),
                "Failed to decode storefront API response"
            );
            ApiError::Decode(e.to_string())
        })
    }

    /// Send a request, map failures, and return the raw body.
    async fn send(&self, builder: RequestBuilder, timeout: Duration) -> Result<String, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map_or_else(|_| preview(&body), |b| b.message);
            error!(
                status = %status,
                message = %message,
                "Storefront API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(timeout)
    } else {
        ApiError::Http(err)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

impl StorefrontApi for HttpApi {
    #[instrument(skip_all, fields(email = %email))]
    async fn register(
        &self,
        full_name: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "register"])?;
        let builder = self
            .request(Method::POST, url, None, timeout)
            .json(&RegisterRequest {
                full_name,
                email: email.as_str(),
                password: password.expose_secret(),
            });
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all, fields(email = %email))]
    async fn login(&self, email: &Email, password: &SecretString) -> Result<SecretString, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "login"])?;
        let builder = self.request(Method::POST, url, None, timeout).json(&LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        });
        let response: LoginResponse = self.send_json(builder, timeout).await?;
        if response.token.trim().is_empty() {
            return Err(ApiError::Decode("login response has an empty token".to_owned()));
        }
        debug!("Login accepted");
        Ok(SecretString::from(response.token))
    }

    #[instrument(skip_all)]
    async fn cart_info(&self, token: &SecretString) -> Result<CartAggregate, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "cart", "info"])?;
        let builder = self.request(Method::GET, url, Some(token), timeout);
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn add_to_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartAggregate, ApiError> {
        let timeout = self.inner.timeouts.add_to_cart;
        let url = self.endpoint(&["users", "cart", product.as_str()])?;
        let builder = self
            .request(Method::PUT, url, Some(token), timeout)
            .json(&AddToCartRequest {
                product_id: product,
                quantity,
            });
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all)]
    async fn cart(&self, token: &SecretString) -> Result<CartContents, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "cart"])?;
        let builder = self.request(Method::GET, url, Some(token), timeout);
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all, fields(product = %product, quantity = quantity))]
    async fn set_cart_quantity(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "cart", product.as_str(), "quantity"])?;
        let builder = self
            .request(Method::PUT, url, Some(token), timeout)
            .json(&QuantityRequest { quantity });
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn remove_from_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "cart", product.as_str()])?;
        let builder = self.request(Method::DELETE, url, Some(token), timeout);
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn clear_cart(&self, token: &SecretString) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "cart", "clear"])?;
        let builder = self.request(Method::DELETE, url, Some(token), timeout);
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn favorites(&self, token: &SecretString) -> Result<Vec<ProductSummary>, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "favorites"])?;
        let builder = self.request(Method::GET, url, Some(token), timeout);
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn add_favorite(&self, token: &SecretString, product: &ProductId) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.favorite;
        let url = self.endpoint(&["users", "favorites", product.as_str()])?;
        let builder = self
            .request(Method::PUT, url, Some(token), timeout)
            .json(&FavoriteRequest {
                product_id: product,
            });
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn remove_favorite(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.favorite;
        let url = self.endpoint(&["users", "favorites", product.as_str()])?;
        let builder = self
            .request(Method::DELETE, url, Some(token), timeout)
            .json(&FavoriteRequest {
                product_id: product,
            });
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn user(&self, token: &SecretString) -> Result<UserProfile, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "user"])?;
        let builder = self.request(Method::GET, url, Some(token), timeout);
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all)]
    async fn update_user(&self, token: &SecretString, update: &ProfileUpdate) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "update"])?;
        let builder = self
            .request(Method::PUT, url, Some(token), timeout)
            .json(update);
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, token: &SecretString, query: &str) -> Result<Vec<ProductSummary>, ApiError> {
        if let Some(hit) = self.inner.search_cache.get(query).await {
            debug!(results = hit.len(), "Search cache hit");
            return Ok(hit.as_ref().clone());
        }

        let timeout = self.inner.timeouts.request;
        let mut url = self.endpoint(&["users", "search"])?;
        url.query_pairs_mut().append_pair("query", query.trim());
        let builder = self.request(Method::GET, url, Some(token), timeout);
        let results: Vec<ProductSummary> = self.send_json(builder, timeout).await?;

        self.inner
            .search_cache
            .insert(query, results.clone())
            .await;
        Ok(results)
    }

    #[instrument(skip_all)]
    async fn recent_searches(&self, token: &SecretString) -> Result<Vec<ProductSummary>, ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "recent-searches"])?;
        let builder = self.request(Method::GET, url, Some(token), timeout);
        self.send_json(builder, timeout).await
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn add_recent_search(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "recent-searches", product.as_str()])?;
        let builder = self.request(Method::PUT, url, Some(token), timeout);
        self.send(builder, timeout).await.map(drop)
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn remove_recent_search(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        let timeout = self.inner.timeouts.request;
        let url = self.endpoint(&["users", "recent-searches", product.as_str()])?;
        let builder = self.request(Method::DELETE, url, Some(token), timeout);
        self.send(builder, timeout).await.map(drop)
    }
}
