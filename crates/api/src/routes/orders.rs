//! Order creation and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use catalog::CatalogSource;
use common::OrderId;
use domain::{OrderItemRequest, OrderService};
use order_store::{Order, OrderStore, Page};
use serde::Deserialize;

use crate::error::ApiError;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Shared application state accessible from all handlers.
pub struct AppState<S, C> {
    pub orders: OrderService<S, C>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// -- Handlers --

/// POST /v1/orders: price and persist a new order.
#[tracing::instrument(skip_all)]
pub async fn create<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: CatalogSource + 'static,
{
    let Json(req) =
        payload.map_err(|e| ApiError::invalid("Invalid request body", e.body_text()))?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY)
        .map(|value| {
            value.to_str().map_err(|_| {
                ApiError::invalid(
                    "Invalid request headers",
                    "Idempotency-Key must be visible ASCII",
                )
            })
        })
        .transpose()?;

    let order = state.orders.create_order(&req.items, idempotency_key).await?;
    let location = format!("/v1/orders/{}", order.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(order),
    )
        .into_response())
}

/// GET /v1/orders/{id}: load one order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Order>, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: CatalogSource + 'static,
{
    let Path(raw) = path.map_err(|e| ApiError::invalid("Invalid order ID", e.body_text()))?;
    let id: i64 = raw.trim().parse().map_err(|_| {
        ApiError::invalid("Invalid order ID", format!("'{raw}' is not a valid order id"))
    })?;

    Ok(Json(state.orders.get_order(OrderId::new(id)).await?))
}

/// GET /v1/orders: list orders, most recent first.
#[tracing::instrument(skip(state))]
pub async fn list<S, C>(
    State(state): State<Arc<AppState<S, C>>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    S: OrderStore + Clone + 'static,
    C: CatalogSource + 'static,
{
    let Query(query) =
        query.map_err(|e| ApiError::invalid("Invalid query parameters", e.body_text()))?;

    let limit = match query.limit {
        Some(limit) if limit < 1 => {
            return Err(ApiError::invalid("Invalid query parameters", "limit must be at least 1"));
        }
        Some(limit) => Some(u32::try_from(limit).unwrap_or(u32::MAX)),
        None => None,
    };
    let offset = match query.offset {
        Some(offset) if offset < 0 => {
            return Err(ApiError::invalid("Invalid query parameters", "offset must not be negative"));
        }
        Some(offset) => Some(offset.unsigned_abs()),
        None => None,
    };

    let page = state.orders.list_orders(limit, offset).await?;
    let headers = pagination_headers(&page);

    Ok((headers, Json(page)).into_response())
}

/// Builds `X-Total-Count` and the RFC 8288 `Link` header for a page.
fn pagination_headers<T>(page: &Page<T>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(page.total));

    let mut links = Vec::new();
    if page.has_next() {
        let next = page.offset + u64::from(page.limit);
        links.push(format!(
            "</v1/orders?limit={}&offset={next}>; rel=\"next\"",
            page.limit
        ));
    }
    if page.has_prev() {
        let prev = page.offset.saturating_sub(u64::from(page.limit));
        links.push(format!(
            "</v1/orders?limit={}&offset={prev}>; rel=\"prev\"",
            page.limit
        ));
    }

    if !links.is_empty()
        && let Ok(value) = HeaderValue::from_str(&links.join(", "))
    {
        headers.insert(header::LINK, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use order_store::PageRequest;

    use super::*;

    fn page(total: u64, limit: u32, offset: u64) -> Page<()> {
        Page::new(Vec::new(), total, PageRequest::new(limit, offset))
    }

    #[test]
    fn middle_page_links_both_ways() {
        let headers = pagination_headers(&page(50, 10, 20));

        assert_eq!(headers["x-total-count"], "50");
        assert_eq!(
            headers[header::LINK],
            "</v1/orders?limit=10&offset=30>; rel=\"next\", </v1/orders?limit=10&offset=10>; rel=\"prev\""
        );
    }

    #[test]
    fn first_and_last_pages() {
        let first = pagination_headers(&page(15, 10, 0));
        assert_eq!(
            first[header::LINK],
            "</v1/orders?limit=10&offset=10>; rel=\"next\""
        );

        let last = pagination_headers(&page(15, 10, 10));
        assert_eq!(
            last[header::LINK],
            "</v1/orders?limit=10&offset=0>; rel=\"prev\""
        );
    }

    #[test]
    fn single_page_has_no_link() {
        let headers = pagination_headers(&page(3, 20, 0));
        assert!(headers.get(header::LINK).is_none());
        assert_eq!(headers["x-total-count"], "3");
    }
}
