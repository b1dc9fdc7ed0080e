//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for every metric the service emits.
///
/// Call once after the recorder is installed.
pub fn describe() {
    metrics::describe_counter!(
        "orders_http_requests_total",
        "HTTP requests by method, route and status"
    );
    metrics::describe_histogram!(
        "orders_http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by route"
    );
    metrics::describe_counter!(
        "orders_created_total",
        "Orders persisted by the order service"
    );
    metrics::describe_counter!(
        "orders_idempotent_replays_total",
        "Create requests answered with an existing order"
    );
    metrics::describe_counter!(
        "orders_create_failures_total",
        "Rejected or failed create requests by reason"
    );
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        Unit::Seconds,
        "End-to-end order creation latency"
    );
    metrics::describe_counter!(
        "catalog_requests_total",
        "Catalog lookups by outcome"
    );
    metrics::describe_histogram!(
        "catalog_request_duration_seconds",
        Unit::Seconds,
        "Catalog lookup latency"
    );
    metrics::describe_counter!(
        "catalog_circuit_open_total",
        "Times the catalog circuit breaker opened"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
