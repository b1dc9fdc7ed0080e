//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be read (bad body, path or query).
    InvalidRequest { title: &'static str, detail: String },
    /// Error from the order service.
    Order(OrderError),
}

impl ApiError {
    pub fn invalid(title: &'static str, detail: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            title,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::InvalidRequest { title, detail } => {
                (StatusCode::UNPROCESSABLE_ENTITY, title, detail)
            }
            ApiError::Order(err) => order_error_to_response(err),
        };

        (status, axum::Json(ErrorBody { error, message })).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, &'static str, String) {
    match &err {
        OrderError::Validation { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation failed",
            err.to_string(),
        ),
        OrderError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "Item not found", err.to_string()),
        OrderError::ItemNotOrderable(_) => {
            (StatusCode::CONFLICT, "Item not available", err.to_string())
        }
        OrderError::UpstreamUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service unavailable",
            err.to_string(),
        ),
        OrderError::IdempotencyConflict { .. } => {
            (StatusCode::CONFLICT, "Idempotency conflict", err.to_string())
        }
        OrderError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "Order not found", err.to_string()),
        OrderError::Internal(msg) => {
            tracing::error!(error = %msg, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "An unexpected error occurred".to_string(),
            )
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

#[cfg(test)]
mod tests {
    use common::{ItemId, OrderId};

    use super::*;

    fn status_of(err: OrderError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn order_errors_map_to_statuses() {
        assert_eq!(
            status_of(OrderError::Validation {
                field: "items".into(),
                message: "must not be empty".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(OrderError::ItemNotFound(ItemId::new(1))), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(OrderError::ItemNotOrderable(ItemId::new(1))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::UpstreamUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(OrderError::IdempotencyConflict { key: "k".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::OrderNotFound(OrderId::new(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::Internal("pool closed".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_request_is_unprocessable() {
        let response = ApiError::invalid("Invalid order ID", "abc").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
