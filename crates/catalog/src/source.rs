use async_trait::async_trait;
use common::ItemId;
use thiserror::Error;

use crate::CatalogItem;

/// Raw outcome of a single catalog lookup that reached the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamResponse {
    /// 200 with a decoded item body.
    Item(CatalogItem),

    /// Any other status code.
    Status(u16),
}

/// The lookup never produced a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog returned an undecodable body: {0}")]
    Decode(String),
}

/// A single-item lookup against the catalog.
///
/// Sources report what the upstream said and nothing more; classification
/// into business outcomes belongs to the gateway.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches one item by id.
    async fn fetch_item(&self, id: ItemId) -> Result<UpstreamResponse, SourceError>;
}
