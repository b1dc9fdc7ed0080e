use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The idempotency key is already recorded in the ledger.
    ///
    /// Raised when a concurrent request committed the same key first.
    #[error("Idempotency key already recorded: {0}")]
    DuplicateIdempotencyKey(String),

    /// The order violates a storage invariant and was not written.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// A stored row could not be mapped back to the domain model.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
