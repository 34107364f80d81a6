//! Shop routes: public listing, restaurant settings and staff management.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{RequireOwner, RequireScreen, Restaurants, Settings};
use crate::models::shop::{Shop, ShopSummary, UpdateShop};
use crate::models::user::{StaffMember, UpdateStaffRole};
use crate::services::{auth as auth_service, shop as shop_service};
use crate::AppState;

/// GET /api/v1/public/shops
pub async fn list_public(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ShopSummary>>>, AppError> {
    let shops = shop_service::list_public(&state.db).await?;
    Ok(ApiResponse::success(shops))
}

/// GET /api/v1/shops
///
/// Shops owned by the caller.
pub async fn list_owned(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Restaurants>,
) -> Result<Json<ApiResponse<Vec<Shop>>>, AppError> {
    let shops = shop_service::list_owned(&state.db, user.id).await?;
    Ok(ApiResponse::success(shops))
}

/// GET /api/v1/shops/current
pub async fn current(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Settings>,
) -> Result<Json<ApiResponse<Shop>>, AppError> {
    let shop = shop_service::find_by_id(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(shop))
}

/// PUT /api/v1/shops/{id} (owner)
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(owner): RequireOwner,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateShop>,
) -> Result<Json<ApiResponse<Shop>>, AppError> {
    body.validate()?;
    let shop = shop_service::update(&state.db, id, owner.id, &body).await?;
    Ok(ApiResponse::success(shop))
}

/// GET /api/v1/shops/current/staff
pub async fn staff(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Settings>,
) -> Result<Json<ApiResponse<Vec<StaffMember>>>, AppError> {
    let staff = auth_service::list_staff(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(staff))
}

/// PUT /api/v1/shops/current/staff/{user_id} (owner)
pub async fn update_staff_role(
    State(state): State<AppState>,
    RequireOwner(owner): RequireOwner,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateStaffRole>,
) -> Result<Json<ApiResponse<StaffMember>>, AppError> {
    let member =
        auth_service::update_staff_role(&state.db, owner.shop()?, owner.id, user_id, body.role)
            .await?;
    Ok(ApiResponse::success(member))
}
