//! Request normalization.
//!
//! Every create-order request is validated and normalized before it reaches
//! the catalog or the database. The normalized form is also what the
//! idempotency hash is computed over.

use std::collections::BTreeMap;

use common::ItemId;
use order_store::MAX_LINE_QUANTITY;
use serde::{Deserialize, Serialize};

use crate::error::{OrderError, Result};

/// One requested item as supplied by the client.
///
/// Fields are signed so that negative values reach validation instead of
/// failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    #[serde(alias = "book_id")]
    pub item_id: i64,
    pub quantity: i64,
}

impl OrderItemRequest {
    pub fn new(item_id: i64, quantity: i64) -> Self {
        Self { item_id, quantity }
    }
}

/// A validated item with duplicates merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// A validated request: unique item ids, each with a quantity in
/// `1..=MAX_LINE_QUANTITY`, sorted by item id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    items: Vec<NormalizedItem>,
}

impl NormalizedRequest {
    pub fn items(&self) -> &[NormalizedItem] {
        &self.items
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.item_id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the merged quantity requested for `item_id`.
    pub fn quantity_of(&self, item_id: ItemId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.item_id == item_id)
            .map(|item| item.quantity)
    }
}

/// Validates a request and merges duplicate item ids by summing quantities.
///
/// Errors name the first offending entry by its 1-based position.
pub fn normalize(items: &[OrderItemRequest]) -> Result<NormalizedRequest> {
    if items.is_empty() {
        return Err(OrderError::validation(
            "items",
            "order must contain at least one item",
        ));
    }

    let max = i64::from(MAX_LINE_QUANTITY);
    let mut merged: BTreeMap<ItemId, u32> = BTreeMap::new();

    for (index, item) in items.iter().enumerate() {
        let position = index + 1;

        if item.item_id <= 0 {
            return Err(OrderError::validation(
                format!("items[{position}].item_id"),
                format!("must be a positive integer, got {}", item.item_id),
            ));
        }
        if item.quantity < 1 || item.quantity > max {
            return Err(OrderError::validation(
                format!("items[{position}].quantity"),
                format!("must be between 1 and {max}, got {}", item.quantity),
            ));
        }

        // Both operands are at most MAX_LINE_QUANTITY, so the sum fits
        let quantity = merged.entry(ItemId::new(item.item_id)).or_insert(0);
        *quantity += item.quantity as u32;
        if *quantity > MAX_LINE_QUANTITY {
            return Err(OrderError::validation(
                format!("items[{position}].quantity"),
                format!(
                    "combined quantity {} for item {} exceeds {max}",
                    *quantity, item.item_id
                ),
            ));
        }
    }

    Ok(NormalizedRequest {
        items: merged
            .into_iter()
            .map(|(item_id, quantity)| NormalizedItem { item_id, quantity })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(items: &[(i64, i64)]) -> Vec<OrderItemRequest> {
        items
            .iter()
            .map(|&(id, qty)| OrderItemRequest::new(id, qty))
            .collect()
    }

    fn field_of(err: OrderError) -> String {
        match err {
            OrderError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn merges_duplicate_items() {
        let normalized = normalize(&req(&[(1, 2), (1, 3)])).unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized.quantity_of(ItemId::new(1)), Some(5));
    }

    #[test]
    fn sorts_by_item_id() {
        let normalized = normalize(&req(&[(9, 1), (2, 1), (5, 1), (2, 4)])).unwrap();
        assert_eq!(
            normalized.item_ids(),
            vec![ItemId::new(2), ItemId::new(5), ItemId::new(9)]
        );
        assert_eq!(normalized.quantity_of(ItemId::new(2)), Some(5));
    }

    #[test]
    fn rejects_empty_request() {
        assert_eq!(field_of(normalize(&[]).unwrap_err()), "items");
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let err = normalize(&req(&[(1, 1), (2, 0)])).unwrap_err();
        assert_eq!(field_of(err), "items[2].quantity");

        let err = normalize(&req(&[(1, -4)])).unwrap_err();
        assert_eq!(field_of(err), "items[1].quantity");
    }

    #[test]
    fn rejects_quantity_above_limit() {
        assert!(normalize(&req(&[(1, 10_000)])).is_ok());

        let err = normalize(&req(&[(1, 10_001)])).unwrap_err();
        assert_eq!(field_of(err), "items[1].quantity");
    }

    #[test]
    fn rejects_merged_quantity_above_limit() {
        let err = normalize(&req(&[(1, 6_000), (2, 1), (1, 5_000)])).unwrap_err();
        assert_eq!(field_of(err), "items[3].quantity");
    }

    #[test]
    fn rejects_invalid_item_id() {
        let err = normalize(&req(&[(0, 1)])).unwrap_err();
        assert_eq!(field_of(err), "items[1].item_id");
    }

    #[test]
    fn accepts_book_id_alias() {
        let item: OrderItemRequest =
            serde_json::from_str(r#"{"book_id": 4, "quantity": 2}"#).unwrap();
        assert_eq!(item, OrderItemRequest::new(4, 2));
    }
}
