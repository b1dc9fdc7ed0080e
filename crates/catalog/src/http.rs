use std::time::Duration;

use async_trait::async_trait;
use common::ItemId;
use reqwest::{StatusCode, header};

use crate::{CatalogItem, CatalogSource, SourceError, UpstreamResponse};

/// User agent sent on every catalog request.
pub const USER_AGENT: &str = concat!("orders-service/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the HTTP catalog.
#[derive(Debug, Clone)]
pub struct HttpCatalogConfig {
    /// Scheme, host and port, e.g. `http://catalog:8080`.
    pub base_url: String,

    /// Path prefix of the item endpoint.
    pub items_path: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpCatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            items_path: "/items".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Catalog source backed by the catalog's HTTP API.
///
/// Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
    items_path: String,
}

impl HttpCatalogSource {
    pub fn new(config: HttpCatalogConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let items_path = format!("/{}", config.items_path.trim_matches('/'));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            items_path,
        })
    }

    /// Returns the URL of one item.
    pub fn item_url(&self, id: ItemId) -> String {
        format!("{}{}/{}", self.base_url, self.items_path, id)
    }
}

fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Transport(err.to_string())
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_item(&self, id: ItemId) -> Result<UpstreamResponse, SourceError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "calling catalog");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(UpstreamResponse::Status(status.as_u16()));
        }

        let item = response.json::<CatalogItem>().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Decode(e.to_string())
            }
        })?;

        Ok(UpstreamResponse::Item(item))
    }
}
