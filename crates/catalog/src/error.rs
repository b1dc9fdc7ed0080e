use common::ItemId;
use thiserror::Error;

/// Errors surfaced by the catalog gateway.
///
/// Every upstream outcome is classified into one of these; raw transport
/// errors never escape the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog has no item with this id.
    #[error("item {0} not found")]
    NotFound(ItemId),

    /// The item exists but is inactive or tombstoned.
    #[error("item {0} is not available for ordering")]
    NotOrderable(ItemId),

    /// The catalog rejected the lookup with a 4xx status.
    #[error("catalog rejected lookup of item {item_id} with status {status}")]
    Client { item_id: ItemId, status: u16 },

    /// Transport failure, timeout or 5xx from the catalog.
    #[error("catalog service unavailable: {0}")]
    Unavailable(String),

    /// The circuit breaker short-circuited the call.
    #[error("catalog circuit breaker is open")]
    CircuitOpen,
}

pub type Result<T> = std::result::Result<T, CatalogError>;
