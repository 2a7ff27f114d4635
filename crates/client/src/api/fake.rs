//! Scriptable in-memory [`StorefrontApi`] for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use grocer_core::{CartAggregate, Email, ProductId};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use super::{
    ApiError, CartContents, CartLine, ProductSummary, ProfileUpdate, StorefrontApi, UserProfile,
};

pub(crate) const TOKEN: &str = "token-1";
pub(crate) const PASSWORD: &str = "hortifruti-2024";

#[derive(Default)]
struct FakeState {
    cart: CartAggregate,
    /// Scripted `cart_info` replies, consumed in order before falling back to `cart`.
    cart_script: VecDeque<(Duration, CartAggregate)>,
    /// Units per product; kept in step with `cart` by every cart mutation.
    lines: BTreeMap<ProductId, u32>,
    favorites: BTreeSet<ProductId>,
    /// Delay applied after the favorites list is read, modelling a response in transit.
    favorites_lag: Duration,
    catalog: Vec<ProductSummary>,
    recent: Vec<ProductId>,
    accounts: Vec<(String, String)>,
    user: UserProfile,
    updates: Vec<ProfileUpdate>,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    calls: HashMap<&'static str, usize>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        let api = Self::default();
        api.with(|s| {
            s.catalog = vec![
                product("arroz", "Arroz integral 1kg", 899),
                product("feijao", "Feijão carioca 1kg", 749),
                product("banana", "Banana prata", 599),
            ];
            s.user = UserProfile {
                given_name: "Ana".to_owned(),
                family_name: "Souza".to_owned(),
                email: "ana@example.com".to_owned(),
                ..UserProfile::default()
            };
        });
        api
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn set_cart(&self, cart: CartAggregate) {
        self.with(|s| s.cart = cart);
    }

    pub(crate) fn script_cart(&self, delay: Duration, cart: CartAggregate) {
        self.with(|s| s.cart_script.push_back((delay, cart)));
    }

    pub(crate) fn set_server_favorites(&self, ids: &[&str]) {
        self.with(|s| s.favorites = ids.iter().map(|id| ProductId::new(*id)).collect());
    }

    pub(crate) fn lag_favorites(&self, lag: Duration) {
        self.with(|s| s.favorites_lag = lag);
    }

    pub(crate) fn server_favorites(&self) -> BTreeSet<ProductId> {
        self.with(|s| s.favorites.clone())
    }

    pub(crate) fn fail(&self, method: &'static str, failing: bool) {
        self.with(|s| {
            if failing {
                s.failing.insert(method);
            } else {
                s.failing.remove(method);
            }
        });
    }

    pub(crate) fn delay(&self, method: &'static str, delay: Duration) {
        self.with(|s| s.delays.insert(method, delay));
    }

    pub(crate) fn calls(&self, method: &'static str) -> usize {
        self.with(|s| s.calls.get(method).copied().unwrap_or(0))
    }

    pub(crate) fn cart_lines(&self) -> BTreeMap<ProductId, u32> {
        self.with(|s| s.lines.clone())
    }

    pub(crate) fn recent(&self) -> Vec<ProductId> {
        self.with(|s| s.recent.clone())
    }

    pub(crate) fn accounts(&self) -> Vec<String> {
        self.with(|s| s.accounts.iter().map(|(email, _)| email.clone()).collect())
    }

    pub(crate) fn updates(&self) -> Vec<ProfileUpdate> {
        self.with(|s| s.updates.clone())
    }

    /// Record the call, apply delay and failure injection, and check the token.
    async fn enter(&self, method: &'static str, token: Option<&SecretString>) -> Result<(), ApiError> {
        let (delay, failing) = self.with(|s| {
            *s.calls.entry(method).or_insert(0) += 1;
            (s.delays.get(method).copied(), s.failing.contains(method))
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{method} failed"),
            });
        }
        if let Some(token) = token
            && token.expose_secret() != TOKEN
        {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("{what} não encontrado"),
    }
}

impl FakeState {
    fn catalog_entry(&self, product: &ProductId) -> Result<&ProductSummary, ApiError> {
        self.catalog
            .iter()
            .find(|p| &p.id == product)
            .ok_or_else(|| not_found("Produto"))
    }

    /// Move `product` from `from` to `to` units, keeping the aggregate in step.
    fn adjust(&mut self, product: &ProductId, from: u32, to: u32) -> Result<(), ApiError> {
        let price = self.catalog_entry(product)?.price;
        self.cart.item_count = (self.cart.item_count + to).saturating_sub(from);
        self.cart.total_value += price * (Decimal::from(to) - Decimal::from(from));
        if to == 0 {
            self.lines.remove(product);
        } else {
            self.lines.insert(product.clone(), to);
        }
        Ok(())
    }
}

pub(crate) fn product(id: &str, name: &str, cents: i64) -> ProductSummary {
    ProductSummary {
        id: ProductId::new(id),
        name: name.to_owned(),
        price: Decimal::new(cents, 2),
        image_url: None,
        department: None,
    }
}

impl StorefrontApi for FakeApi {
    async fn register(
        &self,
        _full_name: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        self.enter("register", None).await?;
        self.with(|s| {
            if s.accounts.iter().any(|(known, _)| known == email.as_str()) {
                return Err(ApiError::Status {
                    status: 409,
                    message: "E-mail já cadastrado".to_owned(),
                });
            }
            s.accounts
                .push((email.as_str().to_owned(), password.expose_secret().to_owned()));
            Ok(())
        })
    }

    async fn login(&self, email: &Email, password: &SecretString) -> Result<SecretString, ApiError> {
        self.enter("login", None).await?;
        let registered = self.with(|s| {
            s.accounts
                .iter()
                .any(|(e, p)| e == email.as_str() && p == password.expose_secret())
        });
        if registered || (email.domain() == "example.com" && password.expose_secret() == PASSWORD) {
            Ok(SecretString::from(TOKEN.to_owned()))
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    async fn cart_info(&self, token: &SecretString) -> Result<CartAggregate, ApiError> {
        self.enter("cart_info", Some(token)).await?;
        let scripted = self.with(|s| s.cart_script.pop_front());
        match scripted {
            Some((delay, cart)) => {
                tokio::time::sleep(delay).await;
                Ok(cart)
            }
            None => Ok(self.with(|s| s.cart)),
        }
    }

    async fn add_to_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartAggregate, ApiError> {
        self.enter("add_to_cart", Some(token)).await?;
        self.with(|s| {
            let current = s.lines.get(product).copied().unwrap_or(0);
            s.adjust(product, current, current + quantity)?;
            Ok(s.cart)
        })
    }

    async fn cart(&self, token: &SecretString) -> Result<CartContents, ApiError> {
        self.enter("cart", Some(token)).await?;
        self.with(|s| {
            let lines = s
                .lines
                .iter()
                .map(|(id, &quantity)| {
                    Ok(CartLine {
                        product: s.catalog_entry(id)?.clone(),
                        quantity,
                    })
                })
                .collect::<Result<_, ApiError>>()?;
            Ok(CartContents { lines })
        })
    }

    async fn set_cart_quantity(
        &self,
        token: &SecretString,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.enter("set_cart_quantity", Some(token)).await?;
        self.with(|s| {
            let current = s.lines.get(product).copied().ok_or_else(|| not_found("Item"))?;
            s.adjust(product, current, quantity)
        })
    }

    async fn remove_from_cart(&self, token: &SecretString, product: &ProductId) -> Result<(), ApiError> {
        self.enter("remove_from_cart", Some(token)).await?;
        self.with(|s| {
            let current = s.lines.get(product).copied().ok_or_else(|| not_found("Item"))?;
            s.adjust(product, current, 0)
        })
    }

    async fn clear_cart(&self, token: &SecretString) -> Result<(), ApiError> {
        self.enter("clear_cart", Some(token)).await?;
        self.with(|s| {
            s.lines.clear();
            s.cart = CartAggregate::empty();
        });
        Ok(())
    }

    async fn favorites(&self, token: &SecretString) -> Result<Vec<ProductSummary>, ApiError> {
        self.enter("favorites", Some(token)).await?;
        let (products, lag): (Vec<_>, _) = self.with(|s| {
            let products = s
                .favorites
                .iter()
                .map(|id| product(id.as_str(), id.as_str(), 100))
                .collect();
            (products, s.favorites_lag)
        });
        if !lag.is_zero() {
            tokio::time::sleep(lag).await;
        }
        Ok(products)
    }

    async fn add_favorite(&self, token: &SecretString, product: &ProductId) -> Result<(), ApiError> {
        self.enter("add_favorite", Some(token)).await?;
        self.with(|s| s.favorites.insert(product.clone()));
        Ok(())
    }

    async fn remove_favorite(&self, token: &SecretString, product: &ProductId) -> Result<(), ApiError> {
        self.enter("remove_favorite", Some(token)).await?;
        self.with(|s| s.favorites.remove(product));
        Ok(())
    }

    async fn user(&self, token: &SecretString) -> Result<UserProfile, ApiError> {
        self.enter("user", Some(token)).await?;
        Ok(self.with(|s| s.user.clone()))
    }

    async fn update_user(&self, token: &SecretString, update: &ProfileUpdate) -> Result<(), ApiError> {
        self.enter("update_user", Some(token)).await?;
        self.with(|s| s.updates.push(update.clone()));
        Ok(())
    }

    async fn search(&self, token: &SecretString, query: &str) -> Result<Vec<ProductSummary>, ApiError> {
        self.enter("search", Some(token)).await?;
        let needle = query.to_lowercase();
        Ok(self.with(|s| {
            s.catalog
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }))
    }

    async fn recent_searches(&self, token: &SecretString) -> Result<Vec<ProductSummary>, ApiError> {
        self.enter("recent_searches", Some(token)).await?;
        self.with(|s| {
            s.recent
                .iter()
                .map(|id| s.catalog_entry(id).cloned())
                .collect()
        })
    }

    async fn add_recent_search(&self, token: &SecretString, product: &ProductId) -> Result<(), ApiError> {
        self.enter("add_recent_search", Some(token)).await?;
        self.with(|s| {
            s.catalog_entry(product)?;
            s.recent.retain(|id| id != product);
            s.recent.insert(0, product.clone());
            Ok(())
        })
    }

    async fn remove_recent_search(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<(), ApiError> {
        self.enter("remove_recent_search", Some(token)).await?;
        self.with(|s| s.recent.retain(|id| id != product));
        Ok(())
    }
}
