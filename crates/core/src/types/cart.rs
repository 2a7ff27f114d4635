//! Server-computed cart summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price::Price;

/// Cart item count and total as computed by the storefront API.
///
/// The client never derives this from line items. It is always replaced
/// wholesale by the latest server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAggregate {
    /// Number of items in the cart.
    pub item_count: u32,
    /// Total value of the cart in the storefront currency.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
}

impl CartAggregate {
    /// Create an aggregate from its parts.
    #[must_use]
    pub const fn new(item_count: u32, total_value: Decimal) -> Self {
        Self {
            item_count,
            total_value,
        }
    }

    /// The aggregate every store starts from.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(0, Decimal::ZERO)
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// The total as a displayable price.
    #[must_use]
    pub fn total(&self) -> Price {
        Price::local(self.total_value)
    }
}
