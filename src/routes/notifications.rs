//! Notification routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Notifications, RequireScreen};
use crate::models::notification::{Notification, NotificationView, UnreadCount};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::notification as notification_service;
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct NotificationFilters {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/v1/notifications?unread=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Notifications>,
    Query(pagination): Query<Pagination>,
    Query(filters): Query<NotificationFilters>,
) -> Result<Json<ApiResponse<PagedResult<NotificationView>>>, AppError> {
    let result =
        notification_service::list(&state.db, user.shop()?, filters.unread, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Notifications>,
) -> Result<Json<ApiResponse<UnreadCount>>, AppError> {
    let count = notification_service::unread_count(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(count))
}

/// PUT /api/v1/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Notifications>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let notification = notification_service::mark_read(&state.db, user.shop()?, id).await?;
    Ok(ApiResponse::success(notification))
}

/// PUT /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Notifications>,
) -> Result<Json<ApiResponse<MarkedRead>>, AppError> {
    let updated = notification_service::mark_all_read(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(MarkedRead { updated }))
}
