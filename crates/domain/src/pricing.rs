use std::collections::HashMap;

use catalog::CatalogItem;
use common::{ItemId, Money};
use order_store::{NewOrder, NewOrderLine};

use crate::error::{OrderError, Result};
use crate::request::NormalizedRequest;

/// Prices a normalized request against catalog snapshots.
///
/// Unit prices are the catalog prices rounded to two places; each line total
/// is `unit_price * quantity` and the order total is their exact sum.
pub fn price_order(
    request: &NormalizedRequest,
    snapshots: &HashMap<ItemId, CatalogItem>,
) -> Result<NewOrder> {
    let mut lines = Vec::with_capacity(request.len());
    let mut total_price = Money::zero();

    for item in request.items() {
        let snapshot = snapshots
            .get(&item.item_id)
            .ok_or(OrderError::ItemNotFound(item.item_id))?;

        let unit_price = snapshot.unit_price().map_err(|e| {
            OrderError::Internal(format!(
                "catalog price for item {}: {e}",
                item.item_id
            ))
        })?;
        let line_total = unit_price
            .times(item.quantity)
            .map_err(|e| OrderError::Internal(e.to_string()))?;
        total_price = total_price
            .checked_add(line_total)
            .map_err(|e| OrderError::Internal(e.to_string()))?;

        lines.push(NewOrderLine {
            item_id: item.item_id,
            title: snapshot.title.clone(),
            author: snapshot.author.clone(),
            quantity: item.quantity,
            unit_price,
            total_price: line_total,
        });
    }

    Ok(NewOrder { lines, total_price })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{OrderItemRequest, normalize};

    fn snapshot(id: i64, price: &str) -> (ItemId, CatalogItem) {
        (
            ItemId::new(id),
            CatalogItem {
                id: ItemId::new(id),
                title: format!("Title {id}"),
                author: format!("Author {id}"),
                description: String::new(),
                price: price.to_string(),
                active: true,
            },
        )
    }

    fn priced(items: &[(i64, i64)], prices: &[(i64, &str)]) -> Result<NewOrder> {
        let requests: Vec<_> = items
            .iter()
            .map(|&(id, qty)| OrderItemRequest::new(id, qty))
            .collect();
        let request = normalize(&requests).unwrap();
        let snapshots = prices.iter().map(|&(id, p)| snapshot(id, p)).collect();
        price_order(&request, &snapshots)
    }

    #[test]
    fn totals_are_exact() {
        let order = priced(&[(1, 2), (2, 1)], &[(1, "19.99"), (2, "24.99")]).unwrap();

        assert_eq!(order.total_price.to_string(), "64.97");
        assert_eq!(order.lines[0].total_price.to_string(), "39.98");
        assert_eq!(order.lines[1].total_price.to_string(), "24.99");
    }

    #[test]
    fn single_unit_keeps_catalog_price() {
        let order = priced(&[(1, 1)], &[(1, "19.99")]).unwrap();
        assert_eq!(order.total_price.to_string(), "19.99");
    }

    #[test]
    fn ten_cents_accumulate_without_drift() {
        let items: Vec<_> = (1..=10).map(|id| (id, 1)).collect();
        let prices: Vec<_> = (1..=10).map(|id| (id, "0.10")).collect();
        let order = priced(&items, &prices).unwrap();
        assert_eq!(order.total_price.to_string(), "1.00");
    }

    #[test]
    fn catalog_price_is_rounded_to_cents() {
        let order = priced(&[(1, 3)], &[(1, "2.675")]).unwrap();
        assert_eq!(order.lines[0].unit_price.to_string(), "2.68");
        assert_eq!(order.total_price.to_string(), "8.04");
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let err = priced(&[(1, 1), (2, 1)], &[(1, "1.00")]).unwrap_err();
        assert_eq!(err, OrderError::ItemNotFound(ItemId::new(2)));
    }

    #[test]
    fn garbled_price_is_internal() {
        let err = priced(&[(1, 1)], &[(1, "free")]).unwrap_err();
        assert!(matches!(err, OrderError::Internal(_)));
    }
}
