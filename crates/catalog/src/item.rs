use common::{ItemId, Money, MoneyError};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a catalog item.
///
/// Fetched once per order creation and never cached. The price stays in the
/// decimal string form the catalog sends; it is only converted to [`Money`]
/// when the order is priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub active: bool,
}

impl CatalogItem {
    /// Parses the catalog price, rounding to two places.
    pub fn unit_price(&self) -> Result<Money, MoneyError> {
        Money::parse(&self.price)
    }
}
