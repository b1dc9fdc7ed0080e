use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    IdempotencyRecord, NewIdempotencyKey, NewOrder, Order, OrderId, OrderLine, Page, PageRequest,
    Result, StoreError,
    store::{OrderStore, validate_new_order},
};

#[derive(Debug, Default)]
struct Tables {
    orders: Vec<Order>,
    idempotency_keys: HashMap<String, IdempotencyRecord>,
    next_order_id: i64,
    next_line_id: i64,
}

/// In-memory order store implementation for testing.
///
/// This implementation keeps all rows in memory and provides the same
/// interface and atomicity as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every subsequent `create_order` call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of order lines stored.
    pub async fn line_count(&self) -> usize {
        self.tables
            .read()
            .await
            .orders
            .iter()
            .map(|o| o.lines.len())
            .sum()
    }

    /// Returns the number of recorded idempotency keys.
    pub async fn idempotency_key_count(&self) -> usize {
        self.tables.read().await.idempotency_keys.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        idempotency_key: Option<NewIdempotencyKey>,
    ) -> Result<Order> {
        validate_new_order(&order)?;

        // Holding the write lock for the whole insert makes it atomic
        let mut tables = self.tables.write().await;

        if let Some(entry) = &idempotency_key
            && tables.idempotency_keys.contains_key(&entry.key)
        {
            return Err(StoreError::DuplicateIdempotencyKey(entry.key.clone()));
        }

        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        tables.next_order_id += 1;
        let order_id = OrderId::new(tables.next_order_id);
        let created_at = Utc::now();

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            tables.next_line_id += 1;
            lines.push(OrderLine {
                id: tables.next_line_id,
                order_id,
                item_id: line.item_id,
                title: line.title,
                author: line.author,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
                created_at,
            });
        }

        let stored = Order {
            id: order_id,
            lines,
            total_price: order.total_price,
            created_at,
        };
        tables.orders.push(stored.clone());

        if let Some(entry) = idempotency_key {
            tables.idempotency_keys.insert(
                entry.key.clone(),
                IdempotencyRecord {
                    key: entry.key,
                    order_id,
                    request_hash: entry.request_hash,
                    created_at,
                },
            );
        }

        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let tables = self.tables.read().await;

        let mut orders: Vec<_> = tables.orders.iter().collect();
        // Most recent first; ids break timestamp ties
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = orders.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let data = orders
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(data, total, page))
    }

    async fn check_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.idempotency_keys.get(key).cloned())
    }
}
