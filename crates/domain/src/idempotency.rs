//! Idempotency key handling.
//!
//! A ledger entry binds a client key to the hash of the normalized request
//! that produced an order. The entry is written by the store in the same
//! transaction as the order; this module decides what an existing entry
//! means for a new request.

use common::OrderId;
use order_store::{NewIdempotencyKey, OrderStore, StoreError};
use sha2::{Digest, Sha256};

use crate::error::{OrderError, Result};
use crate::request::NormalizedRequest;

/// Outcome of looking up an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyCheck {
    /// No entry; create a new order.
    NotFound,

    /// Same key, same request; return the existing order.
    Reuse(OrderId),

    /// Same key, different request.
    Conflict,
}

/// Hashes a normalized request.
///
/// The input is the JSON array of items sorted by id, so requests that
/// differ only in item order or in how duplicates were split hash equally.
pub fn request_hash(request: &NormalizedRequest) -> Result<String> {
    let canonical = serde_json::to_vec(request.items())
        .map_err(|e| OrderError::Internal(format!("failed to encode request: {e}")))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Interprets the idempotency ledger for new requests.
#[derive(Debug, Clone)]
pub struct IdempotencyCoordinator<S> {
    store: S,
}

impl<S: OrderStore> IdempotencyCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Classifies `key` against the ledger.
    pub async fn check(
        &self,
        key: &str,
        request_hash: &str,
    ) -> std::result::Result<IdempotencyCheck, StoreError> {
        let check = match self.store.check_idempotency_key(key).await? {
            None => IdempotencyCheck::NotFound,
            Some(record) if record.request_hash == request_hash => {
                IdempotencyCheck::Reuse(record.order_id)
            }
            Some(_) => IdempotencyCheck::Conflict,
        };
        Ok(check)
    }

    /// Builds the ledger entry the store writes alongside a new order.
    pub fn ledger_entry(&self, key: &str, request_hash: String) -> NewIdempotencyKey {
        NewIdempotencyKey::new(key, request_hash)
    }
}
