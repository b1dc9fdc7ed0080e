use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::ItemId;
use futures_util::{StreamExt, stream};

use crate::{
    BreakerStatus, CatalogError, CatalogItem, CatalogSource, CircuitBreaker, Result, SourceError,
    UpstreamResponse,
};

/// Concurrent lookups per batch by default.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Resilient front for a [`CatalogSource`].
///
/// Every lookup goes through the circuit breaker, and every upstream outcome
/// is classified into a [`CatalogError`] or an item snapshot.
pub struct CatalogGateway<S> {
    source: S,
    breaker: Arc<CircuitBreaker>,
    concurrency: usize,
}

impl<S: CatalogSource> CatalogGateway<S> {
    /// Creates a gateway with the default batch concurrency.
    pub fn new(source: S, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            source,
            breaker,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets the maximum number of concurrent lookups per batch.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Looks up one orderable item.
    ///
    /// Rejected immediately with `CircuitOpen` when the breaker is open.
    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, id: ItemId) -> Result<CatalogItem> {
        if !self.breaker.allow_request() {
            metrics::counter!("catalog_requests_total", "result" => "circuit_open").increment(1);
            return Err(CatalogError::CircuitOpen);
        }

        let start = Instant::now();
        let outcome = self.source.fetch_item(id).await;
        metrics::histogram!("catalog_request_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        let (label, result) = self.classify(id, outcome);
        metrics::counter!("catalog_requests_total", "result" => label).increment(1);
        result
    }

    /// Looks up a set of items with at most `concurrency` calls in flight.
    ///
    /// All lookups run to completion. If any fails, the batch fails with the
    /// error of the earliest failing id in `ids`, and no snapshots are
    /// returned.
    ///
    /// When the breaker is due a trial, the first id is looked up alone so
    /// its outcome decides whether the rest of the batch is admitted.
    #[tracing::instrument(skip(self, ids), fields(item_count = ids.len()))]
    pub async fn get_items(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, CatalogItem>> {
        let Some((&first, rest)) = ids.split_first() else {
            return Ok(HashMap::new());
        };

        let mut results = Vec::with_capacity(ids.len());
        let pending = if self.breaker.status() == BreakerStatus::Probing {
            results.push(self.get_item(first).await);
            rest
        } else {
            ids
        };

        // `buffered` yields in input order regardless of completion order
        let fanned_out: Vec<Result<CatalogItem>> = stream::iter(pending.iter().copied())
            .map(|id| self.get_item(id))
            .buffered(self.concurrency)
            .collect()
            .await;
        results.extend(fanned_out);

        let mut items = HashMap::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(results) {
            items.insert(*id, result?);
        }
        Ok(items)
    }

    fn classify(
        &self,
        id: ItemId,
        outcome: std::result::Result<UpstreamResponse, SourceError>,
    ) -> (&'static str, Result<CatalogItem>) {
        match outcome {
            Ok(UpstreamResponse::Item(item)) => {
                self.breaker.record_success();
                if item.active {
                    ("active", Ok(item))
                } else {
                    ("inactive", Err(CatalogError::NotOrderable(id)))
                }
            }
            Ok(UpstreamResponse::Status(404)) => {
                self.breaker.record_success();
                ("not_found", Err(CatalogError::NotFound(id)))
            }
            Ok(UpstreamResponse::Status(410)) => {
                self.breaker.record_success();
                ("tombstone", Err(CatalogError::NotOrderable(id)))
            }
            Ok(UpstreamResponse::Status(status)) if (400..500).contains(&status) => {
                self.breaker.record_success();
                tracing::warn!(%id, status, "catalog rejected lookup");
                (
                    "client_error",
                    Err(CatalogError::Client {
                        item_id: id,
                        status,
                    }),
                )
            }
            Ok(UpstreamResponse::Status(status)) => {
                self.record_failure();
                tracing::error!(%id, status, "catalog server error");
                (
                    "upstream_error",
                    Err(CatalogError::Unavailable(format!(
                        "catalog returned status {status}"
                    ))),
                )
            }
            Err(error) => {
                self.record_failure();
                tracing::error!(%id, %error, "catalog request failed");
                let label = match error {
                    SourceError::Decode(_) => "upstream_error",
                    SourceError::Timeout | SourceError::Transport(_) => "transport_error",
                };
                (label, Err(CatalogError::Unavailable(error.to_string())))
            }
        }
    }

    fn record_failure(&self) {
        if self.breaker.record_failure() {
            metrics::counter!("catalog_circuit_open_total").increment(1);
        }
    }
}
