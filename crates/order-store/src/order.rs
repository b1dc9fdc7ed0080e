use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, Money, OrderId};

/// Largest quantity a single order line may carry.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Largest amount, in cents, that fits the `NUMERIC(12, 2)` money columns.
pub const MAX_AMOUNT_CENTS: i64 = 999_999_999_999;

/// A persisted, immutable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier.
    pub id: OrderId,

    /// Lines in insertion order.
    #[serde(rename = "items")]
    pub lines: Vec<OrderLine>,

    /// Sum of all line totals.
    pub total_price: Money,

    /// When the order was committed.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the number of lines in the order.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Finds the line for a catalog item.
    pub fn line_for(&self, item_id: ItemId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.item_id == item_id)
    }
}

/// A single line of a persisted order.
///
/// Title, author and unit price are snapshots taken from the catalog when
/// the order was created and are never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub title: String,
    pub author: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

/// An order that has been priced but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub lines: Vec<NewOrderLine>,
    pub total_price: Money,
}

impl NewOrder {
    /// Creates a new order from its lines, summing the line totals.
    pub fn from_lines(lines: Vec<NewOrderLine>) -> Self {
        let total_price = lines.iter().map(|line| line.total_price).sum();
        Self { lines, total_price }
    }
}

/// A priced line waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub item_id: ItemId,
    pub title: String,
    pub author: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// A ledger entry to write alongside a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdempotencyKey {
    pub key: String,
    pub request_hash: String,
}

impl NewIdempotencyKey {
    /// Creates a new ledger entry.
    pub fn new(key: impl Into<String>, request_hash: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            request_hash: request_hash.into(),
        }
    }
}

/// A recorded idempotency ledger entry.
///
/// Written once in the same transaction as its order; never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub order_id: OrderId,
    pub request_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: i64, quantity: u32, unit_cents: i64) -> NewOrderLine {
        let unit_price = Money::from_cents(unit_cents);
        NewOrderLine {
            item_id: ItemId::new(item_id),
            title: format!("Title {item_id}"),
            author: "Author".to_string(),
            quantity,
            unit_price,
            total_price: unit_price.times(quantity).unwrap(),
        }
    }

    #[test]
    fn from_lines_sums_line_totals() {
        let order = NewOrder::from_lines(vec![line(1, 2, 1999), line(2, 1, 2499)]);
        assert_eq!(order.total_price.to_string(), "64.97");
    }

    #[test]
    fn order_serializes_lines_as_items() {
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(1),
            lines: vec![OrderLine {
                id: 10,
                order_id: OrderId::new(1),
                item_id: ItemId::new(3),
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(1999),
                total_price: Money::from_cents(3998),
                created_at: now,
            }],
            total_price: Money::from_cents(3998),
            created_at: now,
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["total_price"], "39.98");
        assert_eq!(json["items"][0]["unit_price"], "19.99");
        assert_eq!(json["items"][0]["item_id"], 3);
        assert!(order.line_for(ItemId::new(3)).is_some());
        assert!(order.line_for(ItemId::new(4)).is_none());
    }
}
