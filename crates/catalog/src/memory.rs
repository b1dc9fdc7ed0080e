//! Scripted in-memory catalog for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::ItemId;

use crate::{CatalogItem, CatalogSource, SourceError, UpstreamResponse};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(UpstreamResponse),
    Fail(SourceError),
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    responses: HashMap<ItemId, Scripted>,
    unavailable: bool,
    latency: Duration,
    calls: HashMap<ItemId, usize>,
    total_calls: usize,
    in_flight: usize,
    peak_in_flight: usize,
}

/// In-memory catalog source for testing.
///
/// Unknown ids answer 404, like the real catalog. Clones share state, so a
/// test can keep a handle after moving a clone into a gateway.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogSource {
    state: Arc<Mutex<InMemoryCatalogState>>,
}

impl InMemoryCatalogSource {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    pub fn insert_item(&self, item: CatalogItem) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(item.id, Scripted::Respond(UpstreamResponse::Item(item)));
    }

    /// Adds an item built from its parts.
    pub fn insert(&self, id: i64, title: &str, author: &str, price: &str, active: bool) {
        self.insert_item(CatalogItem {
            id: ItemId::new(id),
            title: title.to_string(),
            author: author.to_string(),
            description: String::new(),
            price: price.to_string(),
            active,
        });
    }

    /// Makes lookups of `id` answer with a bare status code.
    pub fn set_status(&self, id: i64, status: u16) {
        self.state.lock().unwrap().responses.insert(
            ItemId::new(id),
            Scripted::Respond(UpstreamResponse::Status(status)),
        );
    }

    /// Makes lookups of `id` fail at the transport level.
    pub fn set_transport_failure(&self, id: i64, error: SourceError) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(ItemId::new(id), Scripted::Fail(error));
    }

    /// Makes every lookup fail at the transport level.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    /// Delays every lookup by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    /// Returns the number of lookups received.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().total_calls
    }

    /// Returns the number of lookups received for one id.
    pub fn calls_for(&self, id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&ItemId::new(id))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the highest number of concurrent lookups observed.
    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }

    /// Resets call counters, keeping scripted responses.
    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.total_calls = 0;
        state.peak_in_flight = state.in_flight;
    }
}

/// Decrements the in-flight count even if the lookup is cancelled.
struct InFlight(Arc<Mutex<InMemoryCatalogState>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.in_flight -= 1;
        }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn fetch_item(&self, id: ItemId) -> Result<UpstreamResponse, SourceError> {
        let (scripted, unavailable, latency) = {
            let mut state = self.state.lock().unwrap();
            state.total_calls += 1;
            *state.calls.entry(id).or_default() += 1;
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            (
                state.responses.get(&id).cloned(),
                state.unavailable,
                state.latency,
            )
        };
        let _in_flight = InFlight(Arc::clone(&self.state));

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if unavailable {
            return Err(SourceError::Transport("connection refused".to_string()));
        }

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(UpstreamResponse::Status(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_item_answers_not_found() {
        let source = InMemoryCatalogSource::new();
        let response = source.fetch_item(ItemId::new(1)).await.unwrap();
        assert_eq!(response, UpstreamResponse::Status(404));
        assert_eq!(source.calls_for(1), 1);
    }

    #[tokio::test]
    async fn scripted_responses() {
        let source = InMemoryCatalogSource::new();
        source.insert(1, "Dune", "Frank Herbert", "19.99", true);
        source.set_status(2, 503);
        source.set_transport_failure(3, SourceError::Timeout);

        assert!(matches!(
            source.fetch_item(ItemId::new(1)).await,
            Ok(UpstreamResponse::Item(ref item)) if item.title == "Dune"
        ));
        assert_eq!(
            source.fetch_item(ItemId::new(2)).await,
            Ok(UpstreamResponse::Status(503))
        );
        assert_eq!(
            source.fetch_item(ItemId::new(3)).await,
            Err(SourceError::Timeout)
        );
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn unavailable_overrides_items() {
        let source = InMemoryCatalogSource::new();
        source.insert(1, "Dune", "Frank Herbert", "19.99", true);
        source.set_unavailable(true);

        assert!(matches!(
            source.fetch_item(ItemId::new(1)).await,
            Err(SourceError::Transport(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_lookup_leaves_in_flight_balanced() {
        let source = InMemoryCatalogSource::new();
        source.set_latency(Duration::from_secs(5));

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            source.fetch_item(ItemId::new(1)),
        )
        .await;
        assert!(result.is_err());

        source.reset_calls();
        assert_eq!(source.peak_in_flight(), 0);
    }
}
