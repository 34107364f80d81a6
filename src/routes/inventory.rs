//! Inventory routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Inventory, RequireScreen};
use crate::models::inventory::{
    AdjustStock, CreateInventoryItem, InventoryItemView, UpdateInventoryItem,
};
use crate::services::inventory as inventory_service;
use crate::AppState;

/// GET /api/v1/inventory
pub async fn list(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
) -> Result<Json<ApiResponse<Vec<InventoryItemView>>>, AppError> {
    let items = inventory_service::list(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(items))
}

/// GET /api/v1/inventory/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<InventoryItemView>>, AppError> {
    let item = inventory_service::find_by_id(&state.db, user.shop()?, id).await?;
    Ok(ApiResponse::success(item.into()))
}

/// POST /api/v1/inventory
pub async fn create(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
    Json(body): Json<CreateInventoryItem>,
) -> Result<(StatusCode, Json<ApiResponse<InventoryItemView>>), AppError> {
    body.validate()?;
    let item = inventory_service::create(&state.db, user.shop()?, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(item)))
}

/// PUT /api/v1/inventory/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateInventoryItem>,
) -> Result<Json<ApiResponse<InventoryItemView>>, AppError> {
    body.validate()?;
    let item = inventory_service::update(&state.db, user.shop()?, id, &body).await?;
    Ok(ApiResponse::success(item))
}

/// POST /api/v1/inventory/{id}/adjust
pub async fn adjust(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdjustStock>,
) -> Result<Json<ApiResponse<InventoryItemView>>, AppError> {
    let item = inventory_service::adjust(&state.db, user.shop()?, id, &body).await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /api/v1/inventory/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Inventory>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    inventory_service::delete(&state.db, user.shop()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
