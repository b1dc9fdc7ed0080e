//! Order error taxonomy.

use catalog::CatalogError;
use common::{ItemId, OrderId};
use order_store::StoreError;
use thiserror::Error;

/// Errors surfaced by order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request is malformed. Never retried.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// A requested item does not exist in the catalog.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// A requested item exists but cannot be ordered.
    #[error("item {0} is not available for ordering")]
    ItemNotOrderable(ItemId),

    /// The catalog could not be consulted. Safe to retry with backoff.
    #[error("catalog service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The idempotency key was already used with a different request body.
    #[error("idempotency key '{key}' was already used with a different request")]
    IdempotencyConflict { key: String },

    /// No order has this id.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Storage failure or broken invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrderError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::ItemNotFound(_) => "item_not_found",
            Self::ItemNotOrderable(_) => "item_not_orderable",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::IdempotencyConflict { .. } => "idempotency_conflict",
            Self::OrderNotFound(_) => "order_not_found",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<CatalogError> for OrderError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => Self::ItemNotFound(id),
            CatalogError::NotOrderable(id) => Self::ItemNotOrderable(id),
            CatalogError::Unavailable(msg) => Self::UpstreamUnavailable(msg),
            err @ (CatalogError::Client { .. } | CatalogError::CircuitOpen) => {
                Self::UpstreamUnavailable(err.to_string())
            }
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
