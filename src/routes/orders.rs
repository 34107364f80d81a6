//! Order routes: cart checkout, listing, status changes and the live feed.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{AddItems, Orders, RequireScreen};
use crate::models::order::{CreateOrder, Order, OrderFilters, UpdateOrderStatus};
use crate::models::pagination::{PagedResult, Pagination};
use crate::routes::stream::snapshot_stream;
use crate::services::order as order_service;
use crate::AppState;

/// GET /api/v1/orders?status=&from=&to=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Orders>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<OrderFilters>,
) -> Result<Json<ApiResponse<PagedResult<Order>>>, AppError> {
    let result = order_service::list(&state.db, user.shop()?, &filters, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/orders
pub async fn create(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<AddItems>,
    Json(body): Json<CreateOrder>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), AppError> {
    body.validate()?;
    let order =
        order_service::create(&state.db, &state.realtime, user.shop()?, user.id, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(order)))
}

/// GET /api/v1/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Orders>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order = order_service::find_by_id(&state.db, user.shop()?, id).await?;
    Ok(ApiResponse::success(order))
}

/// PUT /api/v1/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Orders>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderStatus>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let order =
        order_service::transition(&state.db, &state.realtime, user.shop()?, id, body.status)
            .await?;
    Ok(ApiResponse::success(order))
}

/// GET /api/v1/orders/stream
///
/// Live active orders of the caller's shop.
pub async fn stream(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Orders>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let shop_id = user.shop()?;
    let subscription = state.realtime.orders.subscribe(shop_id);
    let initial = order_service::active_orders(&state.db, shop_id).await?;
    tracing::debug!(user_id = %user.id, shop_id = %shop_id, "Order feed opened");
    Ok(snapshot_stream(initial, subscription))
}
