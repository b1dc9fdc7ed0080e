//! Order service: the create/read operations exposed to the HTTP layer.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use catalog::{CatalogGateway, CatalogItem, CatalogSource};
use common::{ItemId, OrderId};
use order_store::{NewIdempotencyKey, Order, OrderStore, Page, PageRequest, StoreError};

use crate::error::{OrderError, Result};
use crate::idempotency::{IdempotencyCheck, IdempotencyCoordinator, request_hash};
use crate::pricing::price_order;
use crate::request::{NormalizedRequest, OrderItemRequest, normalize};

/// Order service settings.
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    /// Honor client idempotency keys.
    pub idempotency_enabled: bool,

    /// Deadline for resolving every item of one request.
    pub catalog_timeout: Duration,

    /// Deadline for each store call.
    pub db_timeout: Duration,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            idempotency_enabled: false,
            catalog_timeout: Duration::from_secs(10),
            db_timeout: Duration::from_secs(3),
        }
    }
}

/// Service for creating and reading orders.
///
/// Ties together normalization, the catalog gateway, pricing, the
/// idempotency ledger and the order store. Every failure is reported as an
/// [`OrderError`]; a failed creation never leaves a partial order behind.
pub struct OrderService<S, C> {
    store: S,
    catalog: CatalogGateway<C>,
    idempotency: IdempotencyCoordinator<S>,
    config: OrderServiceConfig,
}

impl<S, C> OrderService<S, C>
where
    S: OrderStore + Clone,
    C: CatalogSource,
{
    /// Creates a new order service.
    pub fn new(store: S, catalog: CatalogGateway<C>, config: OrderServiceConfig) -> Self {
        Self {
            idempotency: IdempotencyCoordinator::new(store.clone()),
            store,
            catalog,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &CatalogGateway<C> {
        &self.catalog
    }

    pub fn config(&self) -> &OrderServiceConfig {
        &self.config
    }

    /// Creates an order, or returns the order previously created under the
    /// same idempotency key and request.
    ///
    /// The key is ignored when idempotency is disabled or the key is blank.
    #[tracing::instrument(
        skip(self, items),
        fields(item_count = items.len(), idempotency_key = idempotency_key.unwrap_or_default())
    )]
    pub async fn create_order(
        &self,
        items: &[OrderItemRequest],
        idempotency_key: Option<&str>,
    ) -> Result<Order> {
        let start = Instant::now();
        let result = self.try_create_order(items, idempotency_key).await;
        metrics::histogram!("order_create_duration_seconds").record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            metrics::counter!("orders_create_failures_total", "reason" => e.reason())
                .increment(1);
            match e {
                OrderError::Internal(msg) => tracing::error!(error = %msg, "order creation failed"),
                other => tracing::info!(reason = other.reason(), error = %other, "order rejected"),
            }
        }
        result
    }

    async fn try_create_order(
        &self,
        items: &[OrderItemRequest],
        idempotency_key: Option<&str>,
    ) -> Result<Order> {
        let request = normalize(items)?;

        // Keys are opaque: a blank key counts as absent, any other key is used verbatim
        let ledger_entry = match idempotency_key {
            Some(key) if self.config.idempotency_enabled && !key.trim().is_empty() => {
                Some(self.idempotency.ledger_entry(key, request_hash(&request)?))
            }
            _ => None,
        };

        if let Some(entry) = &ledger_entry
            && let Some(order) = self.resolve_existing(entry).await?
        {
            return Ok(order);
        }

        let snapshots = self.lookup_items(&request).await?;
        let new_order = price_order(&request, &snapshots)?;

        match self
            .with_db_timeout(self.store.create_order(new_order, ledger_entry.clone()))
            .await?
        {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total_price = %order.total_price,
                    item_count = order.line_count(),
                    "order created"
                );
                Ok(order)
            }
            Err(StoreError::DuplicateIdempotencyKey(key)) => {
                // A concurrent request with the same key committed first
                tracing::info!(idempotency_key = %key, "lost idempotency race, re-checking");
                let entry = ledger_entry.ok_or_else(|| {
                    OrderError::Internal(format!("unexpected duplicate idempotency key '{key}'"))
                })?;
                self.resolve_existing(&entry).await?.ok_or_else(|| {
                    OrderError::Internal(format!(
                        "idempotency key '{key}' reported as duplicate but not recorded"
                    ))
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the order already bound to `entry`, if any.
    async fn resolve_existing(&self, entry: &NewIdempotencyKey) -> Result<Option<Order>> {
        let check = self
            .with_db_timeout(self.idempotency.check(&entry.key, &entry.request_hash))
            .await??;

        match check {
            IdempotencyCheck::NotFound => Ok(None),
            IdempotencyCheck::Conflict => Err(OrderError::IdempotencyConflict {
                key: entry.key.clone(),
            }),
            IdempotencyCheck::Reuse(order_id) => {
                let order = self
                    .with_db_timeout(self.store.get_order(order_id))
                    .await??
                    .ok_or_else(|| {
                        OrderError::Internal(format!(
                            "idempotency key '{}' points at missing order {order_id}",
                            entry.key
                        ))
                    })?;

                metrics::counter!("orders_idempotent_replays_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    idempotency_key = %entry.key,
                    "returning existing order for idempotency key"
                );
                Ok(Some(order))
            }
        }
    }

    async fn lookup_items(
        &self,
        request: &NormalizedRequest,
    ) -> Result<HashMap<ItemId, CatalogItem>> {
        let ids = request.item_ids();
        tokio::time::timeout(self.config.catalog_timeout, self.catalog.get_items(&ids))
            .await
            .map_err(|_| OrderError::UpstreamUnavailable("catalog lookup timed out".to_string()))?
            .map_err(OrderError::from)
    }

    async fn with_db_timeout<T>(
        &self,
        op: impl Future<Output = order_store::Result<T>>,
    ) -> Result<order_store::Result<T>> {
        tokio::time::timeout(self.config.db_timeout, op)
            .await
            .map_err(|_| OrderError::Internal("database operation timed out".to_string()))
    }

    /// Loads one order with its lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.with_db_timeout(self.store.get_order(id))
            .await??
            .ok_or(OrderError::OrderNotFound(id))
    }

    /// Lists orders, most recent first.
    ///
    /// The limit defaults to 20 and is clamped to `1..=200`; the offset
    /// defaults to 0.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, limit: Option<u32>, offset: Option<u64>) -> Result<Page<Order>> {
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            limit.unwrap_or(defaults.limit),
            offset.unwrap_or(defaults.offset),
        );
        Ok(self.with_db_timeout(self.store.list_orders(page)).await??)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::{CircuitBreaker, InMemoryCatalogSource};
    use order_store::InMemoryOrderStore;

    use super::*;

    fn service(
        store: &InMemoryOrderStore,
        catalog: &InMemoryCatalogSource,
        idempotency_enabled: bool,
    ) -> OrderService<InMemoryOrderStore, InMemoryCatalogSource> {
        OrderService::new(
            store.clone(),
            CatalogGateway::new(catalog.clone(), Arc::new(CircuitBreaker::default())),
            OrderServiceConfig {
                idempotency_enabled,
                ..OrderServiceConfig::default()
            },
        )
    }

    fn items(raw: &[(i64, i64)]) -> Vec<OrderItemRequest> {
        raw.iter()
            .map(|&(id, qty)| OrderItemRequest::new(id, qty))
            .collect()
    }

    #[tokio::test]
    async fn validation_failure_touches_nothing() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        let service = service(&store, &catalog, true);

        let err = service
            .create_order(&items(&[(1, 0)]), Some("key"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Validation { .. }));
        assert_eq!(catalog.call_count(), 0);
        assert_eq!(store.idempotency_key_count().await, 0);
    }

    #[tokio::test]
    async fn key_ignored_when_disabled() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        catalog.insert(1, "Dune", "Frank Herbert", "19.99", true);
        let service = service(&store, &catalog, false);

        let first = service.create_order(&items(&[(1, 1)]), Some("k")).await.unwrap();
        let second = service.create_order(&items(&[(1, 1)]), Some("k")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.idempotency_key_count().await, 0);
    }

    #[tokio::test]
    async fn blank_key_is_ignored() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        catalog.insert(1, "Dune", "Frank Herbert", "19.99", true);
        let service = service(&store, &catalog, true);

        service.create_order(&items(&[(1, 1)]), Some("   ")).await.unwrap();
        assert_eq!(store.idempotency_key_count().await, 0);
    }

    #[tokio::test]
    async fn key_is_stored_verbatim() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        catalog.insert(1, "Dune", "Frank Herbert", "19.99", true);
        let service = service(&store, &catalog, true);

        let padded = service.create_order(&items(&[(1, 1)]), Some("k ")).await.unwrap();
        let bare = service.create_order(&items(&[(1, 1)]), Some("k")).await.unwrap();

        assert_ne!(padded.id, bare.id);
        assert_eq!(store.idempotency_key_count().await, 2);

        let record = store.check_idempotency_key("k ").await.unwrap().unwrap();
        assert_eq!(record.order_id, padded.id);
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        catalog.insert(1, "Dune", "Frank Herbert", "19.99", true);
        store.set_fail_on_create(true);
        let service = service(&store, &catalog, true);

        let err = service
            .create_order(&items(&[(1, 1)]), Some("k"))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Internal(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.idempotency_key_count().await, 0);
    }

    #[tokio::test]
    async fn get_missing_order() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        let service = service(&store, &catalog, false);

        assert_eq!(
            service.get_order(OrderId::new(7)).await.unwrap_err(),
            OrderError::OrderNotFound(OrderId::new(7))
        );
    }

    #[tokio::test]
    async fn list_applies_default_and_clamped_limits() {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogSource::new();
        let service = service(&store, &catalog, false);

        let page = service.list_orders(None, None).await.unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);

        let page = service.list_orders(Some(1_000), Some(5)).await.unwrap();
        assert_eq!(page.limit, 200);
        assert_eq!(page.offset, 5);
    }
}
