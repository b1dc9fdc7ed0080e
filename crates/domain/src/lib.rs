//! Order creation for the orders service.
//!
//! This crate provides the order-creation core:
//! - Request normalization and validation
//! - Exact fixed-point pricing against catalog snapshots
//! - Idempotency key hashing and ledger checks
//! - `OrderService`, which ties them to the catalog gateway and order store

pub mod error;
pub mod idempotency;
pub mod pricing;
pub mod request;
pub mod service;

pub use error::{OrderError, Result};
pub use idempotency::{IdempotencyCheck, IdempotencyCoordinator, request_hash};
pub use pricing::price_order;
pub use request::{NormalizedItem, NormalizedRequest, OrderItemRequest, normalize};
pub use service::{OrderService, OrderServiceConfig};
