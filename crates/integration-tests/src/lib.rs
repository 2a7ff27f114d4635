//! Integration tests for Grocer.
//!
//! The tests in `tests/` run the real `reqwest` client and the file-backed
//! key-value store against [`FakeStorefront`], an in-process axum server that
//! speaks the storefront REST contract.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p grocer-integration-tests
//! ```
//!
//! # Routes
//!
//! ```text
//! POST   /users/register              - {fullName, email, password}
//! POST   /users/login                 - {email, password} -> {token}
//! GET    /users/cart                  - {productIds: [{productId, quantity}]}
//! GET    /users/cart/info             - {itemCount, totalValue}
//! PUT    /users/cart/{id}             - {productId, quantity} -> {itemCount, totalValue}
//! PUT    /users/cart/{id}/quantity    - {quantity}
//! DELETE /users/cart/{id}             - remove line
//! DELETE /users/cart/clear            - empty cart
//! GET    /users/favorites             - [{_id, name, price}]
//! PUT    /users/favorites/{id}        - favorite
//! DELETE /users/favorites/{id}        - unfavorite
//! GET    /users/user                  - profile
//! PUT    /users/update                - partial profile update
//! GET    /users/search?query=         - [{_id, name, price}]
//! GET    /users/recent-searches       - [{_id, name, price}], newest first
//! PUT    /users/recent-searches/{id}  - record
//! DELETE /users/recent-searches/{id}  - forget
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Token issued by the fake login.
pub const TOKEN: &str = "token-1";
/// Password the fake login accepts for any `@example.com` address.
pub const PASSWORD: &str = "hortifruti-2024";

/// A catalog entry: id, name, price in cents.
pub type CatalogEntry = (&'static str, &'static str, i64);

/// Products the fake backend sells.
pub const CATALOG: &[CatalogEntry] = &[
    ("arroz", "Arroz integral 1kg", 899),
    ("feijao", "Feijão carioca 1kg", 749),
    ("banana", "Banana prata", 599),
];

#[derive(Debug, Default)]
struct Backend {
    item_count: u32,
    total_cents: i64,
    lines: BTreeMap<String, u32>,
    recent: Vec<String>,
    accounts: Vec<(String, String)>,
    favorites: BTreeSet<String>,
    updates: Vec<Value>,
    calls: HashMap<&'static str, usize>,
    favorite_delay: Duration,
    broken_cart: bool,
}

type Shared = Arc<Mutex<Backend>>;

/// Running fake storefront API.
///
/// The server task is aborted on drop.
pub struct FakeStorefront {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeStorefront {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = router(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake storefront: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("failed to read local address: {e}"));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                panic!("fake storefront stopped: {e}");
            }
        });
        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL to point the client at.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of requests served by `route` (e.g. `"cart_info"`).
    #[must_use]
    pub fn calls(&self, route: &'static str) -> usize {
        self.with(|b| b.calls.get(route).copied().unwrap_or(0))
    }

    /// Server-side favorites.
    #[must_use]
    pub fn favorites(&self) -> BTreeSet<String> {
        self.with(|b| b.favorites.clone())
    }

    /// Replace the server-side favorites.
    pub fn set_favorites(&self, ids: &[&str]) {
        self.with(|b| b.favorites = ids.iter().map(|id| (*id).to_owned()).collect());
    }

    /// Replace the server-side cart.
    pub fn set_cart(&self, item_count: u32, total_cents: i64) {
        self.with(|b| {
            b.item_count = item_count;
            b.total_cents = total_cents;
        });
    }

    /// Server-side cart lines: product ID to units.
    #[must_use]
    pub fn cart_lines(&self) -> BTreeMap<String, u32> {
        self.with(|b| b.lines.clone())
    }

    /// Server-side recent searches, newest first.
    #[must_use]
    pub fn recent(&self) -> Vec<String> {
        self.with(|b| b.recent.clone())
    }

    /// Emails of accounts created through `/users/register`.
    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        self.with(|b| b.accounts.iter().map(|(email, _)| email.clone()).collect())
    }

    /// Delay favorite mutations by `delay`.
    pub fn delay_favorites(&self, delay: Duration) {
        self.with(|b| b.favorite_delay = delay);
    }

    /// Make the cart endpoint return a body that is not JSON.
    pub fn break_cart(&self, broken: bool) {
        self.with(|b| b.broken_cart = broken);
    }

    /// Profile update bodies received so far.
    #[must_use]
    pub fn updates(&self) -> Vec<Value> {
        self.with(|b| b.updates.clone())
    }
}

impl Drop for FakeStorefront {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/cart", get(cart))
        .route("/users/cart/info", get(cart_info))
        .route("/users/cart/clear", delete(clear_cart))
        .route("/users/cart/{id}", put(add_to_cart).delete(remove_from_cart))
        .route("/users/cart/{id}/quantity", put(set_quantity))
        .route("/users/favorites", get(favorites))
        .route(
            "/users/favorites/{id}",
            put(add_favorite).delete(remove_favorite),
        )
        .route("/users/user", get(user))
        .route("/users/update", put(update_user))
        .route("/users/search", get(search))
        .route("/users/recent-searches", get(recent_searches))
        .route(
            "/users/recent-searches/{id}",
            put(add_recent_search).delete(remove_recent_search),
        )
        .with_state(state)
}

// =============================================================================
// Helpers
// =============================================================================

fn record(state: &Shared, route: &'static str) {
    let mut backend = state.lock().unwrap_or_else(PoisonError::into_inner);
    *backend.calls.entry(route).or_insert(0) += 1;
}

fn with_backend<R>(state: &Shared, f: impl FnOnce(&mut Backend) -> R) -> R {
    f(&mut state.lock().unwrap_or_else(PoisonError::into_inner))
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Reject requests without the issued bearer token.
fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Token inválido")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn money(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn product_json(id: &str) -> Value {
    let (name, cents) = CATALOG
        .iter()
        .find(|(catalog_id, _, _)| *catalog_id == id)
        .map_or((id, 0), |(_, name, cents)| (*name, *cents));
    json!({ "_id": id, "name": name, "price": money(cents), "department": "Mercearia" })
}

fn price_cents(id: &str) -> Option<i64> {
    CATALOG
        .iter()
        .find(|(catalog_id, _, _)| *catalog_id == id)
        .map(|(_, _, cents)| *cents)
}

fn ok() -> Response {
    Json(json!({ "message": "ok" })).into_response()
}

impl Backend {
    /// Move `id` from its current units to `to`, keeping the aggregate in step.
    fn set_line(&mut self, id: &str, cents: i64, to: u32) {
        let from = self.lines.get(id).copied().unwrap_or(0);
        self.item_count = (self.item_count + to).saturating_sub(from);
        self.total_cents += cents * (i64::from(to) - i64::from(from));
        if to == 0 {
            self.lines.remove(id);
        } else {
            self.lines.insert(id.to_owned(), to);
        }
    }
}

fn cart_json(backend: &Backend) -> Value {
    json!({ "itemCount": backend.item_count, "totalValue": money(backend.total_cents) })
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    full_name: String,
    email: String,
    password: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    record(&state, "register");
    if body.full_name.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "Nome obrigatório");
    }
    with_backend(&state, |b| {
        if b.accounts.iter().any(|(email, _)| *email == body.email) {
            return error(StatusCode::CONFLICT, "E-mail já cadastrado");
        }
        b.accounts.push((body.email, body.password));
        (StatusCode::CREATED, Json(json!({ "message": "Usuário criado" }))).into_response()
    })
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    record(&state, "login");
    let registered = with_backend(&state, |b| {
        b.accounts
            .iter()
            .any(|(email, password)| *email == body.email && *password == body.password)
    });
    if registered || (body.email.ends_with("@example.com") && body.password == PASSWORD) {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Credenciais inválidas")
    }
}

async fn cart_info(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "cart_info");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    with_backend(&state, |b| {
        if b.broken_cart {
            (StatusCode::OK, "<html>gateway</html>").into_response()
        } else {
            Json(cart_json(b)).into_response()
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartBody {
    product_id: String,
    quantity: u32,
}

async fn add_to_cart(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AddToCartBody>,
) -> Response {
    record(&state, "add_to_cart");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    if body.product_id != id || body.quantity == 0 {
        return error(StatusCode::BAD_REQUEST, "Requisição inválida");
    }
    let Some(cents) = price_cents(&id) else {
        return error(StatusCode::NOT_FOUND, "Produto não encontrado");
    };
    with_backend(&state, |b| {
        let current = b.lines.get(&id).copied().unwrap_or(0);
        b.set_line(&id, cents, current + body.quantity);
        Json(cart_json(b)).into_response()
    })
}

async fn cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "cart");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let lines = with_backend(&state, |b| b.lines.clone());
    let lines: Vec<Value> = lines
        .iter()
        .map(|(id, quantity)| json!({ "productId": product_json(id), "quantity": quantity }))
        .collect();
    Json(json!({ "productIds": lines })).into_response()
}

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: u32,
}

async fn set_quantity(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<QuantityBody>,
) -> Response {
    record(&state, "set_quantity");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    if body.quantity == 0 {
        return error(StatusCode::BAD_REQUEST, "Quantidade inválida");
    }
    let cents = price_cents(&id).unwrap_or(0);
    with_backend(&state, |b| {
        if !b.lines.contains_key(&id) {
            return error(StatusCode::NOT_FOUND, "Item não encontrado no carrinho");
        }
        b.set_line(&id, cents, body.quantity);
        ok()
    })
}

async fn remove_from_cart(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "remove_from_cart");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let cents = price_cents(&id).unwrap_or(0);
    with_backend(&state, |b| {
        if !b.lines.contains_key(&id) {
            return error(StatusCode::NOT_FOUND, "Item não encontrado no carrinho");
        }
        b.set_line(&id, cents, 0);
        ok()
    })
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "clear_cart");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    with_backend(&state, |b| {
        b.lines.clear();
        b.item_count = 0;
        b.total_cents = 0;
    });
    ok()
}

async fn favorites(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "favorites");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let ids = with_backend(&state, |b| b.favorites.clone());
    Json(ids.iter().map(|id| product_json(id)).collect::<Vec<_>>()).into_response()
}

async fn add_favorite(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "add_favorite");
    mutate_favorite(&state, &headers, id, true).await
}

async fn remove_favorite(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "remove_favorite");
    mutate_favorite(&state, &headers, id, false).await
}

async fn mutate_favorite(state: &Shared, headers: &HeaderMap, id: String, favorite: bool) -> Response {
    if let Err(rejection) = authorize(headers) {
        return rejection;
    }
    let delay = with_backend(state, |b| b.favorite_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    with_backend(state, |b| {
        if favorite {
            b.favorites.insert(id);
        } else {
            b.favorites.remove(&id);
        }
    });
    ok()
}

async fn user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "user");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    Json(json!({
        "_id": "u1",
        "givenName": "Ana",
        "familyName": "Souza",
        "email": "ana@example.com",
        "cpf": "",
        "number": "(11) 9 8765-4321",
    }))
    .into_response()
}

async fn update_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "update_user");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    with_backend(&state, |b| b.updates.push(body));
    Json(json!({ "message": "Usuário atualizado" })).into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

async fn search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    record(&state, "search");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let needle = params.query.to_lowercase();
    let results: Vec<Value> = CATALOG
        .iter()
        .filter(|(_, name, _)| name.to_lowercase().contains(&needle))
        .map(|(id, _, _)| product_json(id))
        .collect();
    Json(results).into_response()
}

async fn recent_searches(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "recent_searches");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    let recent = with_backend(&state, |b| b.recent.clone());
    Json(recent.iter().map(|id| product_json(id)).collect::<Vec<_>>()).into_response()
}

async fn add_recent_search(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "add_recent_search");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    with_backend(&state, |b| {
        b.recent.retain(|known| *known != id);
        b.recent.insert(0, id);
    });
    ok()
}

async fn remove_recent_search(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "remove_recent_search");
    if let Err(rejection) = authorize(&headers) {
        return rejection;
    }
    with_backend(&state, |b| b.recent.retain(|known| *known != id));
    ok()
}
