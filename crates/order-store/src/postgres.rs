use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    IdempotencyRecord, ItemId, Money, NewIdempotencyKey, NewOrder, Order, OrderId, OrderLine,
    Page, PageRequest, Result, StoreError,
    store::{OrderStore, validate_new_order},
};

const IDEMPOTENCY_KEY_CONSTRAINT: &str = "idempotency_keys_pkey";

const LINE_COLUMNS: &str =
    "id, order_id, item_id, title, author, quantity, unit_price, total_price, created_at";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::CorruptRow(format!("negative quantity {quantity}")))?;

        Ok(OrderLine {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            item_id: ItemId::new(row.try_get("item_id")?),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            quantity,
            unit_price: Money::from_decimal(row.try_get::<Decimal, _>("unit_price")?),
            total_price: Money::from_decimal(row.try_get::<Decimal, _>("total_price")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            lines,
            total_price: Money::from_decimal(row.try_get::<Decimal, _>("total_price")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    /// Loads the lines of several orders, grouped by order id.
    async fn load_lines(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderLine>>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY order_id, id"
        ))
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let line = Self::row_to_line(row)?;
            grouped
                .entry(line.order_id.as_i64())
                .or_default()
                .push(line);
        }
        Ok(grouped)
    }
}

/// Writes a ledger entry on the given connection.
///
/// Must run inside the transaction that created `order_id`.
async fn record_idempotency_key(
    conn: &mut PgConnection,
    entry: &NewIdempotencyKey,
    order_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO idempotency_keys (key, order_id, request_hash)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(&entry.key)
    .bind(order_id)
    .bind(&entry.request_hash)
    .execute(conn)
    .await
    .map_err(|e| {
        // A concurrent request committed the same key first
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some(IDEMPOTENCY_KEY_CONSTRAINT)
        {
            return StoreError::DuplicateIdempotencyKey(entry.key.clone());
        }
        StoreError::Database(e)
    })?;

    Ok(())
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        idempotency_key: Option<NewIdempotencyKey>,
    ) -> Result<Order> {
        validate_new_order(&order)?;

        // Dropping the transaction without commit rolls everything back
        let mut tx = self.pool.begin().await?;

        if let Some(entry) = &idempotency_key {
            let existing: Option<i64> =
                sqlx::query_scalar("SELECT order_id FROM idempotency_keys WHERE key = $1")
                    .bind(&entry.key)
                    .fetch_optional(&mut *tx)
                    .await?;

            if existing.is_some() {
                return Err(StoreError::DuplicateIdempotencyKey(entry.key.clone()));
            }
        }

        let row = sqlx::query("INSERT INTO orders (total_price) VALUES ($1) RETURNING id, created_at")
            .bind(order.total_price.as_decimal())
            .fetch_one(&mut *tx)
            .await?;
        let order_id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| StoreError::InvalidOrder(format!("quantity {}", line.quantity)))?;

            let row = sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, item_id, title, author, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, created_at
                "#,
            )
            .bind(order_id)
            .bind(line.item_id.as_i64())
            .bind(&line.title)
            .bind(&line.author)
            .bind(quantity)
            .bind(line.unit_price.as_decimal())
            .bind(line.total_price.as_decimal())
            .fetch_one(&mut *tx)
            .await?;

            lines.push(OrderLine {
                id: row.try_get("id")?,
                order_id: OrderId::new(order_id),
                item_id: line.item_id,
                title: line.title.clone(),
                author: line.author.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
                created_at: row.try_get("created_at")?,
            });
        }

        if let Some(entry) = &idempotency_key {
            record_idempotency_key(&mut *tx, entry, order_id).await?;
        }

        tx.commit().await?;

        tracing::debug!(order_id, lines = lines.len(), "order persisted");

        Ok(Order {
            id: OrderId::new(order_id),
            lines,
            total_price: order.total_price,
            created_at,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, total_price, created_at FROM orders WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_line)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self::row_to_order(&row, lines)?))
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<Order>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, total_price, created_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let order_ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut lines = if order_ids.is_empty() {
            HashMap::new()
        } else {
            self.load_lines(&order_ids).await?
        };

        let orders = rows
            .iter()
            .zip(order_ids)
            .map(|(row, id)| Self::row_to_order(row, lines.remove(&id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(orders, u64::try_from(total).unwrap_or(0), page))
    }

    async fn check_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT key, order_id, request_hash, created_at
            FROM idempotency_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(IdempotencyRecord {
                key: row.try_get("key")?,
                order_id: OrderId::new(row.try_get("order_id")?),
                request_hash: row.try_get("request_hash")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
