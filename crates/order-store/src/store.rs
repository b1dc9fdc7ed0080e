use async_trait::async_trait;

use crate::{
    IdempotencyRecord, MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, Money, NewIdempotencyKey, NewOrder, Order, OrderId,
    Page, PageRequest, Result, StoreError,
};

/// Core trait for order store implementations.
///
/// A store is pure data access: it enforces storage invariants but carries
/// no business policy. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order with all of its lines.
    ///
    /// The order, its lines and the optional ledger entry are written
    /// atomically - either all succeed or none do. If `idempotency_key` is
    /// already recorded, the write is abandoned with
    /// `DuplicateIdempotencyKey`.
    ///
    /// Returns the order with its generated ids and timestamps.
    async fn create_order(
        &self,
        order: NewOrder,
        idempotency_key: Option<NewIdempotencyKey>,
    ) -> Result<Order>;

    /// Retrieves an order with its lines.
    ///
    /// Returns None if the order doesn't exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders, most recent first.
    ///
    /// `Page::total` is the full row count regardless of the window.
    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>>;

    /// Looks up a ledger entry by key.
    ///
    /// Returns None if the key was never recorded.
    async fn check_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Verifies the store is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Validates a priced order before it is written.
pub fn validate_new_order(order: &NewOrder) -> Result<()> {
    if order.lines.is_empty() {
        return Err(StoreError::InvalidOrder(
            "order must contain at least one line".to_string(),
        ));
    }

    let max_amount = Money::from_cents(MAX_AMOUNT_CENTS);
    let mut sum = Money::zero();
    for line in &order.lines {
        if !line.item_id.is_valid() {
            return Err(StoreError::InvalidOrder(format!(
                "invalid item id {}",
                line.item_id
            )));
        }
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(StoreError::InvalidOrder(format!(
                "quantity {} for item {} is outside 1..={MAX_LINE_QUANTITY}",
                line.quantity, line.item_id
            )));
        }
        let expected = line
            .unit_price
            .times(line.quantity)
            .map_err(|e| StoreError::InvalidOrder(e.to_string()))?;
        if line.total_price != expected {
            return Err(StoreError::InvalidOrder(format!(
                "line total {} for item {} does not equal {} x {}",
                line.total_price, line.item_id, line.unit_price, line.quantity
            )));
        }
        if line.total_price > max_amount {
            return Err(StoreError::InvalidOrder(format!(
                "line total {} for item {} exceeds the storable maximum {max_amount}",
                line.total_price, line.item_id
            )));
        }
        sum = sum
            .checked_add(line.total_price)
            .map_err(|e| StoreError::InvalidOrder(e.to_string()))?;
    }

    if order.total_price > max_amount {
        return Err(StoreError::InvalidOrder(format!(
            "order total {} exceeds the storable maximum {max_amount}",
            order.total_price
        )));
    }
    if sum != order.total_price {
        return Err(StoreError::InvalidOrder(format!(
            "order total {} does not equal sum of lines {}",
            order.total_price, sum
        )));
    }

    Ok(())
}
