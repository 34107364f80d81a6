//! Menu routes: categories and products. Reads follow the menu screen,
//! writes need a manager.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Menu, RequireManager, RequireScreen};
use crate::models::category::{Category, CreateCategory, UpdateCategory};
use crate::models::product::{CreateProduct, Product, ProductFilters, UpdateProduct};
use crate::services::{category as category_service, product as product_service};
use crate::AppState;

/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Menu>,
) -> Result<Json<ApiResponse<Vec<Category>>>, AppError> {
    let categories = category_service::list(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(categories))
}

/// POST /api/v1/categories (manager+)
pub async fn create_category(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Json(body): Json<CreateCategory>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), AppError> {
    body.validate()?;
    let category = category_service::create(&state.db, manager.shop()?, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(category)))
}

/// PUT /api/v1/categories/{id} (manager+)
pub async fn update_category(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategory>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    body.validate()?;
    let category = category_service::update(&state.db, manager.shop()?, id, &body).await?;
    Ok(ApiResponse::success(category))
}

/// DELETE /api/v1/categories/{id} (manager+)
pub async fn delete_category(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    category_service::delete(&state.db, manager.shop()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/products?category_id=&available=&search=
pub async fn list_products(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Menu>,
    Query(filters): Query<ProductFilters>,
) -> Result<Json<ApiResponse<Vec<Product>>>, AppError> {
    let products = product_service::list(&state.db, user.shop()?, &filters).await?;
    Ok(ApiResponse::success(products))
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Menu>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let product = product_service::find_by_id(&state.db, user.shop()?, id).await?;
    Ok(ApiResponse::success(product))
}

/// POST /api/v1/products (manager+)
pub async fn create_product(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Json(body): Json<CreateProduct>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), AppError> {
    body.validate()?;
    let product = product_service::create(&state.db, manager.shop()?, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(product)))
}

/// PUT /api/v1/products/{id} (manager+)
pub async fn update_product(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProduct>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    body.validate()?;
    let product = product_service::update(&state.db, manager.shop()?, id, &body).await?;
    Ok(ApiResponse::success(product))
}

/// DELETE /api/v1/products/{id} (manager+)
pub async fn delete_product(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    product_service::delete(&state.db, manager.shop()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
