//! App-root composition of the stores.
//!
//! A [`Session`] owns one cart, favorites and theme store over a shared API
//! client and key-value store. It implements the flows that span stores:
//! startup, registration, login, logout, and the server-first mutations.
//! Every cart mutation is followed by a refresh of the cart aggregate.

use std::sync::Arc;
use std::time::Duration;

use grocer_core::{CartAggregate, Email, ProductId, validate_new_password};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::api::{CartContents, ProductSummary, ProfileUpdate, StorefrontApi, UserProfile};
use crate::error::SessionError;
use crate::profile::ProfileDraft;
use crate::search::SearchController;
use crate::storage::{FAVORITES_KEY, KeyValueStore, TOKEN_KEY, read_token};
use crate::stores::{CartStore, FavoritesStore, Refresh, ThemeStore};

/// Most recent searches kept for display.
pub const RECENT_SEARCH_LIMIT: usize = 10;

/// Outcome of [`Session::bootstrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bootstrap {
    /// Theme in effect after loading.
    pub dark_mode: bool,
    /// Whether a token was found.
    pub signed_in: bool,
    /// Result of restoring the favorites mirror.
    pub cached_favorites: Refresh,
    /// Result of the cart refresh.
    pub cart: Refresh,
    /// Result of favorites hydration.
    pub favorites: Refresh,
}

/// One user session on this device.
pub struct Session<A, S> {
    api: Arc<A>,
    storage: Arc<S>,
    cart: CartStore<A, S>,
    favorites: FavoritesStore<A, S>,
    theme: ThemeStore<S>,
}

impl<A, S> Session<A, S>
where
    A: StorefrontApi,
    S: KeyValueStore,
{
    /// Compose a session over `api` and `storage`.
    pub fn new(api: Arc<A>, storage: Arc<S>) -> Self {
        Self {
            cart: CartStore::new(Arc::clone(&api), Arc::clone(&storage)),
            favorites: FavoritesStore::new(Arc::clone(&api), Arc::clone(&storage)),
            theme: ThemeStore::new(Arc::clone(&storage)),
            api,
            storage,
        }
    }

    /// The cart store.
    pub const fn cart(&self) -> &CartStore<A, S> {
        &self.cart
    }

    /// The favorites store.
    pub const fn favorites(&self) -> &FavoritesStore<A, S> {
        &self.favorites
    }

    /// The theme store.
    pub const fn theme(&self) -> &ThemeStore<S> {
        &self.theme
    }

    /// Whether a token is stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the token cannot be read.
    pub async fn is_signed_in(&self) -> Result<bool, SessionError> {
        Ok(read_token(self.storage.as_ref()).await?.is_some())
    }

    async fn token(&self) -> Result<SecretString, SessionError> {
        read_token(self.storage.as_ref())
            .await?
            .ok_or(SessionError::NotSignedIn)
    }

    /// Load device state and, when signed in, refresh from the server.
    ///
    /// The theme is loaded first so the first screen renders in the right
    /// mode. Never fails; see the returned outcomes.
    #[instrument(skip_all)]
    pub async fn bootstrap(&self) -> Bootstrap {
        let dark_mode = self.theme.load_theme().await;
        let cached_favorites = self.favorites.restore_cached().await;
        let signed_in = self.is_signed_in().await.unwrap_or(false);

        let (cart, favorites) = if signed_in {
            tokio::join!(self.cart.fetch_cart_info(), self.favorites.fetch_favorites())
        } else {
            (Refresh::Skipped, Refresh::Skipped)
        };

        info!(dark_mode, signed_in, ?cart, ?favorites, "Session bootstrapped");
        Bootstrap {
            dark_mode,
            signed_in,
            cached_favorites,
            cart,
            favorites,
        }
    }

    /// Create an account.
    ///
    /// Does not sign in; the user logs in with the new credentials next.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingName`, `SessionError::InvalidEmail` or
    /// `SessionError::InvalidPassword` before any request, or
    /// `SessionError::Api` if the server rejects the account.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<(), SessionError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(SessionError::MissingName);
        }
        let email = Email::parse(email)?;
        validate_new_password(password.expose_secret())?;
        self.api.register(full_name, &email, password).await?;
        info!("Account created");
        Ok(())
    }

    /// Sign in, store the token and hydrate the cart and favorites.
    ///
    /// Favorites left over from a previous account are cleared first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidEmail` before any request if the email
    /// is malformed, `SessionError::Api` if the credentials are rejected, or
    /// `SessionError::Storage` if the token cannot be stored.
    #[instrument(skip_all, fields(email = %email.trim()))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), SessionError> {
        let email = Email::parse(email)?;
        let token = self.api.login(&email, password).await?;
        self.storage
            .set_item(TOKEN_KEY, token.expose_secret())
            .await?;

        self.favorites.clear_favorites().await;
        let (cart, favorites) =
            tokio::join!(self.cart.fetch_cart_info(), self.favorites.fetch_favorites());
        info!(?cart, ?favorites, "Signed in");
        Ok(())
    }

    /// Forget the token and every per-account slice of state.
    ///
    /// Memory is reset even if storage fails, and every key is attempted
    /// even if an earlier removal fails. The theme is kept.
    ///
    /// # Errors
    ///
    /// Returns the first `SessionError::Storage` hit while removing the token
    /// or the favorites mirror.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.favorites.clear_favorites().await;
        self.cart.set_cart_info(CartAggregate::empty());

        let mut first_error = None;
        for key in [TOKEN_KEY, FAVORITES_KEY] {
            if let Err(e) = self.storage.remove_item(key).await {
                warn!(key, error = %e, "Failed to remove account state");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e.into());
        }
        info!("Signed out");
        Ok(())
    }

    /// Flip a favorite on the server, then locally.
    ///
    /// Local state changes only after the server accepted the change.
    /// Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token,
    /// `SessionError::Api` if the server call fails or times out (local state
    /// untouched), or `SessionError::Store` if the local mirror cannot be
    /// written.
    #[instrument(skip_all, fields(product = %product))]
    pub async fn toggle_favorite(&self, product: &ProductId) -> Result<bool, SessionError> {
        let token = self.token().await?;
        let favorite = !self.favorites.is_favorite(product);
        if favorite {
            self.api.add_favorite(&token, product).await?;
        } else {
            self.api.remove_favorite(&token, product).await?;
        }
        let favorite = self.favorites.set_favorite(product, favorite).await?;
        debug!(favorite, "Favorite toggled");
        Ok(favorite)
    }

    /// Add `quantity` units of `product` to the cart.
    ///
    /// Applies the aggregate from the response, then refreshes it. Returns
    /// the aggregate in effect afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuantity` for zero,
    /// `SessionError::NotSignedIn` without a token, or `SessionError::Api` if
    /// the request fails or times out.
    #[instrument(skip_all, fields(product = %product, quantity = quantity))]
    pub async fn add_to_cart(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartAggregate, SessionError> {
        if quantity == 0 {
            return Err(SessionError::InvalidQuantity);
        }
        let token = self.token().await?;
        let aggregate = self.api.add_to_cart(&token, product, quantity).await?;
        self.cart.set_cart_info(aggregate);
        Ok(self.refresh_cart().await)
    }

    /// Fetch the cart with its line items.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all)]
    pub async fn cart_lines(&self) -> Result<CartContents, SessionError> {
        let token = self.token().await?;
        Ok(self.api.cart(&token).await?)
    }

    /// Change the quantity of a product already in the cart.
    ///
    /// Returns the refreshed aggregate.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuantity` for zero (use
    /// [`remove_from_cart`](Self::remove_from_cart)),
    /// `SessionError::NotSignedIn` without a token, or `SessionError::Api` if
    /// the request fails.
    #[instrument(skip_all, fields(product = %product, quantity = quantity))]
    pub async fn set_quantity(
        &self,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartAggregate, SessionError> {
        if quantity == 0 {
            return Err(SessionError::InvalidQuantity);
        }
        let token = self.token().await?;
        self.api.set_cart_quantity(&token, product, quantity).await?;
        Ok(self.refresh_cart().await)
    }

    /// Remove a product's line from the cart.
    ///
    /// Returns the refreshed aggregate.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all, fields(product = %product))]
    pub async fn remove_from_cart(&self, product: &ProductId) -> Result<CartAggregate, SessionError> {
        let token = self.token().await?;
        self.api.remove_from_cart(&token, product).await?;
        Ok(self.refresh_cart().await)
    }

    /// Empty the cart.
    ///
    /// The aggregate drops to zero as soon as the server accepts, then is
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails; the aggregate is kept then.
    #[instrument(skip_all)]
    pub async fn clear_cart(&self) -> Result<CartAggregate, SessionError> {
        let token = self.token().await?;
        self.api.clear_cart(&token).await?;
        self.cart.set_cart_info(CartAggregate::empty());
        Ok(self.refresh_cart().await)
    }

    async fn refresh_cart(&self) -> CartAggregate {
        let outcome = self.cart.fetch_cart_info().await;
        debug!(?outcome, "Cart refreshed after mutation");
        self.cart.cart_info()
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all)]
    pub async fn profile(&self) -> Result<UserProfile, SessionError> {
        let token = self.token().await?;
        Ok(self.api.user(&token).await?)
    }

    /// Validate `draft` against `original` and send only what changed.
    ///
    /// Returns the update that was sent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Profile` if the draft is invalid or unchanged
    /// (nothing is sent), `SessionError::NotSignedIn` without a token, or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        draft: &ProfileDraft,
        original: &UserProfile,
    ) -> Result<ProfileUpdate, SessionError> {
        let update = draft.diff(original)?;
        let token = self.token().await?;
        self.api.update_user(&token, &update).await?;
        info!("Profile updated");
        Ok(update)
    }

    /// One-shot catalog search.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search(&self, query: &str) -> Result<Vec<ProductSummary>, SessionError> {
        let token = self.token().await?;
        Ok(self.api.search(&token, query).await?)
    }

    /// Products recently opened from search, newest first, at most
    /// [`RECENT_SEARCH_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all)]
    pub async fn recent_searches(&self) -> Result<Vec<ProductSummary>, SessionError> {
        let token = self.token().await?;
        let mut recent = self.api.recent_searches(&token).await?;
        recent.truncate(RECENT_SEARCH_LIMIT);
        Ok(recent)
    }

    /// Record that the user opened `product` from search.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all, fields(product = %product))]
    pub async fn record_recent_search(&self, product: &ProductId) -> Result<(), SessionError> {
        let token = self.token().await?;
        Ok(self.api.add_recent_search(&token, product).await?)
    }

    /// Drop `product` from the recent searches.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` without a token or
    /// `SessionError::Api` if the request fails.
    #[instrument(skip_all, fields(product = %product))]
    pub async fn remove_recent_search(&self, product: &ProductId) -> Result<(), SessionError> {
        let token = self.token().await?;
        Ok(self.api.remove_recent_search(&token, product).await?)
    }

    /// Debounced search bound to this session's API and token.
    pub fn search_controller(&self, debounce: Duration) -> SearchController<A, S>
    where
        A: 'static,
        S: 'static,
    {
        SearchController::new(Arc::clone(&self.api), Arc::clone(&self.storage), debounce)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;

    use super::*;
    use crate::api::ApiError;
    use crate::api::fake::{FakeApi, PASSWORD, TOKEN};
    use crate::storage::{DARK_MODE_KEY, MemoryStore};

    type TestSession = Session<FakeApi, MemoryStore>;

    fn session_with(storage: MemoryStore) -> (Arc<FakeApi>, Arc<MemoryStore>, TestSession) {
        let api = Arc::new(FakeApi::new());
        let storage = Arc::new(storage);
        let session = Session::new(api.clone(), storage.clone());
        (api, storage, session)
    }

    fn signed_in() -> (Arc<FakeApi>, Arc<MemoryStore>, TestSession) {
        session_with(MemoryStore::with_entries([(TOKEN_KEY, TOKEN)]))
    }

    fn password() -> SecretString {
        SecretString::from(PASSWORD.to_owned())
    }

    fn id(raw: &str) -> ProductId {
        ProductId::new(raw)
    }

    #[tokio::test]
    async fn test_bootstrap_signed_out_only_loads_device_state() {
        let (api, _, session) = session_with(MemoryStore::with_entries([
            (DARK_MODE_KEY, "true"),
            (FAVORITES_KEY, r#"{"arroz":true}"#),
        ]));

        let boot = session.bootstrap().await;
        assert!(boot.dark_mode);
        assert!(!boot.signed_in);
        assert_eq!(boot.cached_favorites, Refresh::Applied);
        assert_eq!(boot.cart, Refresh::Skipped);
        assert_eq!(boot.favorites, Refresh::Skipped);
        assert!(session.favorites().is_favorite(&id("arroz")));
        assert_eq!(api.calls("cart_info"), 0);
        assert_eq!(api.calls("favorites"), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_signed_in_hydrates() {
        let (api, _, session) = signed_in();
        api.set_cart(CartAggregate::new(2, Decimal::new(2_000, 2)));
        api.set_server_favorites(&["feijao"]);

        let boot = session.bootstrap().await;
        assert!(boot.signed_in);
        assert_eq!(boot.cart, Refresh::Applied);
        assert_eq!(boot.favorites, Refresh::Applied);
        assert_eq!(session.cart().cart_info().item_count, 2);
        assert!(session.favorites().is_loaded());
        assert!(session.favorites().is_favorite(&id("feijao")));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_email_before_request() {
        let (api, _, session) = session_with(MemoryStore::new());

        let err = session.login("ana.example.com", &password()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidEmail(_)));
        assert_eq!(api.calls("login"), 0);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_stores_nothing() {
        let (_, storage, session) = session_with(MemoryStore::new());

        let wrong = SecretString::from("nope".to_owned());
        let err = session.login("ana@example.com", &wrong).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Unauthorized)));
        assert!(err.needs_login());
        assert_eq!(storage.peek(TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_login_stores_token_and_hydrates() {
        let (api, storage, session) = session_with(MemoryStore::new());
        api.set_cart(CartAggregate::new(1, Decimal::new(599, 2)));
        api.set_server_favorites(&["banana"]);

        session.login(" ana@Example.com ", &password()).await.unwrap();
        assert_eq!(storage.peek(TOKEN_KEY).as_deref(), Some(TOKEN));
        assert!(session.is_signed_in().await.unwrap());
        assert_eq!(session.cart().cart_info().item_count, 1);
        assert_eq!(session.favorites().favorites(), BTreeSet::from([id("banana")]));
    }

    #[tokio::test]
    async fn test_logout_clears_account_state_but_keeps_theme() {
        let (api, storage, session) = signed_in();
        api.set_cart(CartAggregate::new(3, Decimal::new(4_550, 2)));
        api.set_server_favorites(&["arroz"]);
        session.bootstrap().await;
        session.theme().set_dark_mode(true).await.unwrap();
        session.toggle_favorite(&id("banana")).await.unwrap();
        assert!(storage.peek(FAVORITES_KEY).is_some());

        session.logout().await.unwrap();
        assert_eq!(storage.peek(TOKEN_KEY), None);
        assert_eq!(storage.peek(FAVORITES_KEY), None);
        assert_eq!(session.cart().cart_info(), CartAggregate::empty());
        assert!(session.favorites().favorites().is_empty());
        assert!(!session.favorites().is_loaded());
        assert!(session.theme().dark_mode());
        assert_eq!(storage.peek(DARK_MODE_KEY).as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_logout_removes_mirror_when_token_removal_fails() {
        let (api, storage, session) = signed_in();
        api.set_server_favorites(&["arroz"]);
        session.bootstrap().await;
        assert!(storage.peek(FAVORITES_KEY).is_some());
        storage.fail_writes_to(TOKEN_KEY);

        let err = session.logout().await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(storage.peek(FAVORITES_KEY), None);
        assert!(session.favorites().favorites().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_favorite_goes_to_server_first() {
        let (api, _, session) = signed_in();
        let banana = id("banana");

        assert!(session.toggle_favorite(&banana).await.unwrap());
        assert_eq!(api.calls("add_favorite"), 1);
        assert!(api.server_favorites().contains(&banana));
        assert!(session.favorites().is_favorite(&banana));

        assert!(!session.toggle_favorite(&banana).await.unwrap());
        assert_eq!(api.calls("remove_favorite"), 1);
        assert!(api.server_favorites().is_empty());
        assert!(!session.favorites().is_favorite(&banana));
    }

    #[tokio::test]
    async fn test_failed_server_toggle_leaves_local_state() {
        let (api, storage, session) = signed_in();
        api.fail("add_favorite", true);
        let writes = storage.write_count();

        let err = session.toggle_favorite(&id("arroz")).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(_)));
        assert!(!session.favorites().is_favorite(&id("arroz")));
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_signed_out_mutations_make_no_requests() {
        let (api, _, session) = session_with(MemoryStore::new());

        let err = session.toggle_favorite(&id("arroz")).await.unwrap_err();
        assert!(err.needs_login());
        let err = session.add_to_cart(&id("arroz"), 1).await.unwrap_err();
        assert!(matches!(err, SessionError::NotSignedIn));
        assert_eq!(api.calls("add_favorite"), 0);
        assert_eq!(api.calls("add_to_cart"), 0);
    }

    #[tokio::test]
    async fn test_add_to_cart_applies_and_refreshes() {
        let (api, _, session) = signed_in();

        let cart = session.add_to_cart(&id("feijao"), 2).await.unwrap();
        assert_eq!(cart, CartAggregate::new(2, Decimal::new(1_498, 2)));
        assert_eq!(api.calls("add_to_cart"), 1);
        assert_eq!(api.calls("cart_info"), 1);
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_zero_quantity() {
        let (api, _, session) = signed_in();

        let err = session.add_to_cart(&id("feijao"), 0).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuantity));
        assert_eq!(api.calls("add_to_cart"), 0);
    }

    #[tokio::test]
    async fn test_failed_add_keeps_cart() {
        let (api, _, session) = signed_in();
        session.cart().set_cart_info(CartAggregate::new(1, Decimal::ONE));

        let err = session.add_to_cart(&id("missing"), 1).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Status { status: 404, .. })));
        assert_eq!(session.cart().cart_info(), CartAggregate::new(1, Decimal::ONE));
        assert_eq!(api.calls("cart_info"), 0);
    }

    #[tokio::test]
    async fn test_cart_line_mutations_refresh_aggregate() {
        let (api, _, session) = signed_in();
        session.add_to_cart(&id("arroz"), 1).await.unwrap();
        session.add_to_cart(&id("banana"), 2).await.unwrap();

        let lines = session.cart_lines().await.unwrap();
        assert_eq!(lines.lines.len(), 2);
        assert_eq!(lines.line(&id("banana")).map(|l| l.quantity), Some(2));

        let cart = session.set_quantity(&id("arroz"), 3).await.unwrap();
        assert_eq!(cart, CartAggregate::new(5, Decimal::new(3_895, 2)));
        assert_eq!(session.cart().cart_info(), cart);

        let cart = session.remove_from_cart(&id("banana")).await.unwrap();
        assert_eq!(cart, CartAggregate::new(3, Decimal::new(2_697, 2)));
        assert_eq!(api.cart_lines().get(&id("banana")), None);
        assert_eq!(api.calls("cart_info"), 4);
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_zero() {
        let (api, _, session) = signed_in();
        session.add_to_cart(&id("arroz"), 2).await.unwrap();

        let err = session.set_quantity(&id("arroz"), 0).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuantity));
        assert_eq!(api.calls("set_cart_quantity"), 0);
        assert_eq!(api.cart_lines().get(&id("arroz")), Some(&2));
    }

    #[tokio::test]
    async fn test_failed_removal_keeps_aggregate() {
        let (api, _, session) = signed_in();
        session.add_to_cart(&id("feijao"), 1).await.unwrap();
        let before = session.cart().cart_info();

        let err = session.remove_from_cart(&id("arroz")).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Status { status: 404, .. })));
        assert_eq!(session.cart().cart_info(), before);
        assert_eq!(api.calls("cart_info"), 1);
    }

    #[tokio::test]
    async fn test_clear_cart_zeroes_aggregate() {
        let (api, _, session) = signed_in();
        session.add_to_cart(&id("arroz"), 2).await.unwrap();
        let mut rx = session.cart().subscribe();
        rx.borrow_and_update();

        let cart = session.clear_cart().await.unwrap();
        assert!(cart.is_empty());
        assert!(rx.has_changed().unwrap());
        assert!(api.cart_lines().is_empty());
        assert!(session.cart_lines().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_aggregate() {
        let (api, _, session) = signed_in();
        session.add_to_cart(&id("arroz"), 2).await.unwrap();
        api.fail("clear_cart", true);

        let err = session.clear_cart().await.unwrap_err();
        assert!(matches!(err, SessionError::Api(_)));
        assert_eq!(session.cart().cart_info().item_count, 2);
    }

    #[tokio::test]
    async fn test_register_validates_before_request() {
        let (api, _, session) = session_with(MemoryStore::new());
        let strong = SecretString::from("feira#2024".to_owned());

        let err = session.register("  ", "bia@mercado.com", &strong).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingName));
        let err = session.register("Bia", "bia", &strong).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidEmail(_)));
        let weak = SecretString::from("feira2024".to_owned());
        let err = session.register("Bia", "bia@mercado.com", &weak).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPassword(_)));
        assert_eq!(api.calls("register"), 0);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (api, storage, session) = session_with(MemoryStore::new());
        let secret = SecretString::from("feira#2024".to_owned());

        session.register(" Bia Lima ", "bia@mercado.com", &secret).await.unwrap();
        assert_eq!(api.accounts(), vec!["bia@mercado.com".to_owned()]);
        assert_eq!(storage.peek(TOKEN_KEY), None);

        session.login("bia@mercado.com", &secret).await.unwrap();
        assert!(session.is_signed_in().await.unwrap());

        let err = session.register("Bia", "bia@mercado.com", &secret).await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Status { status: 409, .. })));
    }

    #[tokio::test]
    async fn test_recent_searches_newest_first() {
        let (api, _, session) = signed_in();
        session.record_recent_search(&id("arroz")).await.unwrap();
        session.record_recent_search(&id("banana")).await.unwrap();
        session.record_recent_search(&id("arroz")).await.unwrap();

        let recent = session.recent_searches().await.unwrap();
        let ids: Vec<_> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["arroz", "banana"]);

        session.remove_recent_search(&id("arroz")).await.unwrap();
        assert_eq!(api.recent(), vec![id("banana")]);
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_changes() {
        let (api, _, session) = signed_in();
        let profile = session.profile().await.unwrap();

        let draft = ProfileDraft::from_profile(&profile);
        let err = session.update_profile(&draft, &profile).await.unwrap_err();
        assert!(matches!(err, SessionError::Profile(_)));
        assert!(api.updates().is_empty());

        let mut draft = draft;
        draft.set_cpf("529.982.247-25");
        let update = session.update_profile(&draft, &profile).await.unwrap();
        assert_eq!(update.cpf.as_deref(), Some("52998224725"));
        assert_eq!(update.given_name, None);
        assert_eq!(api.updates(), vec![update]);
    }

    #[tokio::test]
    async fn test_one_shot_search() {
        let (_, _, session) = signed_in();
        let results = session.search("arroz").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.first().map(|p| &p.id), Some(&id("arroz")));
    }
}
