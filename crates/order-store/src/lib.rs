//! Order persistence.
//!
//! Stores orders, their lines and the idempotency ledger. Every order is
//! written together with its lines (and, when supplied, its ledger entry)
//! in a single transaction.

pub mod error;
pub mod memory;
pub mod order;
pub mod page;
pub mod postgres;
pub mod store;

pub use common::{ItemId, Money, OrderId};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use order::{
    IdempotencyRecord, MAX_AMOUNT_CENTS, MAX_LINE_QUANTITY, NewIdempotencyKey, NewOrder, NewOrderLine, Order,
    OrderLine,
};
pub use page::{Page, PageRequest};
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, validate_new_order};
