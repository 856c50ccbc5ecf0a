//! Order dashboard handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use orderbridge_core::types::pagination::{PageRequest, PageResponse};
use orderbridge_entity::order::model::Order;
use orderbridge_service::order::OrderDetails;

use crate::dto::request::OrderListQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>, ApiError> {
    let page = PageRequest::new(query.page.unwrap_or(1), query.page_size.unwrap_or(25));
    let orders = state.order_service.list(query.status, &page).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetails>>, ApiError> {
    let details = state.order_service.get(order_id).await?;
    Ok(Json(ApiResponse::ok(details)))
}
