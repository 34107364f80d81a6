//! Dashboard routes: today-versus-yesterday overview.

use axum::{extract::State, Json};
use chrono::Utc;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Dashboard, RequireScreen};
use crate::services::dashboard::{self, DashboardStats};
use crate::AppState;

/// GET /api/v1/dashboard/stats
pub async fn stats(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Dashboard>,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    let now = Utc::now().with_timezone(&state.config.dashboard_offset());
    let stats = dashboard::get_stats(&state.db, user.shop()?, now).await;
    Ok(ApiResponse::success(stats))
}
