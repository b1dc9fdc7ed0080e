//! HTTP request metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Route label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Records request count and latency per route template.
///
/// `/health` and `/metrics` are not recorded.
pub async fn track_http_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());

    if matches!(route.as_deref(), Some("/health" | "/metrics")) {
        return next.run(req).await;
    }

    let route = route.unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::counter!(
        "orders_http_requests_total",
        "method" => method,
        "route" => route.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("orders_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}
