//! Wire types for the storefront REST API.

use grocer_core::{Price, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as returned by the favorites and search endpoints.
///
/// Only `_id` is guaranteed; everything else defaults when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Unit price.
    #[serde(default, with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Product image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Department the product is listed under.
    #[serde(default)]
    pub department: Option<String>,
}

impl ProductSummary {
    /// Unit price in the storefront currency.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::local(self.price)
    }
}

/// One line of the cart: a product and how many units of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// The product, populated by the server.
    #[serde(rename = "productId")]
    pub product: ProductSummary,
    /// Units in the cart.
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::local(self.product.price * Decimal::from(self.quantity))
    }
}

/// The cart with its line items, as returned by `GET /users/cart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartContents {
    /// Lines in the order the server keeps them.
    #[serde(rename = "productIds", default)]
    pub lines: Vec<CartLine>,
}

impl CartContents {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for `product`, if present.
    #[must_use]
    pub fn line(&self, product: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product.id == product)
    }
}

/// The signed-in user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// User identifier.
    #[serde(rename = "_id")]
    pub id: Option<UserId>,
    /// First name.
    pub given_name: String,
    /// Last name.
    pub family_name: String,
    /// Login email.
    pub email: String,
    /// CPF as stored by the server (may be empty or masked).
    pub cpf: String,
    /// Phone number as stored by the server (may be empty or masked).
    pub number: String,
}

/// Partial profile update; only changed fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New first name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// New last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// New CPF digits (empty clears it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// New phone digits (empty clears it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

impl ProfileUpdate {
    /// Whether no field changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.given_name.is_none()
            && self.family_name.is_none()
            && self.cpf.is_none()
            && self.number.is_none()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FavoriteRequest<'a> {
    pub product_id: &'a ProductId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequest<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Error body the API sends with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
