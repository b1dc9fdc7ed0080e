//! Health check endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use catalog::{BreakerStatus, CatalogSource};
use order_store::OrderStore;
use serde::Serialize;

use crate::routes::orders::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: BTreeMap<&'static str, &'static str>,
    pub circuit_breaker: BreakerStatus,
}

/// GET /health: reports database reachability and the catalog breaker.
///
/// Only the database decides the overall status; an open breaker marks the
/// catalog unhealthy without failing the check.
pub async fn check<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: OrderStore + Clone + 'static,
    C: CatalogSource + 'static,
{
    let mut services = BTreeMap::new();

    let database_ok = match state.orders.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "database health check failed");
            false
        }
    };
    services.insert("database", if database_ok { "healthy" } else { "unhealthy" });

    let breaker = state.orders.catalog().breaker().status();
    if breaker != BreakerStatus::Closed {
        tracing::warn!(circuit_breaker = %breaker, "catalog circuit breaker is not closed");
    }
    services.insert(
        "catalog",
        if breaker == BreakerStatus::Open {
            "unhealthy"
        } else {
            "healthy"
        },
    );

    let (status, code) = if database_ok {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            services,
            circuit_breaker: breaker,
        }),
    )
}
