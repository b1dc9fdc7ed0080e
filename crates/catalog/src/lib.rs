//! Catalog gateway for the orders service.
//!
//! Resolves catalog item ids to point-in-time snapshots while shielding
//! order creation from a slow or failing catalog:
//!
//! - [`CatalogSource`] performs one raw lookup (HTTP or in-memory)
//! - [`CircuitBreaker`] stops calling the catalog after repeated failures
//! - [`CatalogGateway`] classifies responses and fans out batch lookups
//!   with bounded concurrency

pub mod breaker;
pub mod error;
pub mod gateway;
pub mod http;
pub mod item;
pub mod memory;
pub mod source;

pub use breaker::{BreakerStatus, CircuitBreaker, CircuitBreakerConfig};
pub use common::ItemId;
pub use error::{CatalogError, Result};
pub use gateway::{CatalogGateway, DEFAULT_CONCURRENCY};
pub use http::{HttpCatalogConfig, HttpCatalogSource, USER_AGENT};
pub use item::CatalogItem;
pub use memory::InMemoryCatalogSource;
pub use source::{CatalogSource, SourceError, UpstreamResponse};
