//! Analytics routes: trailing-window summary and CSV export.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Analytics, RequireScreen};
use crate::models::pagination::DateRange;
use crate::services::analytics::{self, AnalyticsQuery, AnalyticsSummary};
use crate::AppState;

/// GET /api/v1/analytics/summary?days=30
pub async fn summary(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Analytics>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ApiResponse<AnalyticsSummary>>, AppError> {
    let days = query.days()?;
    let now = Utc::now().with_timezone(&state.config.dashboard_offset());
    let summary = analytics::summary(&state.db, user.shop()?, days, now).await?;
    Ok(ApiResponse::success(summary))
}

/// GET /api/v1/analytics/export?from=&to=
pub async fn export(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Analytics>,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, AppError> {
    let csv = analytics::export_csv(&state.db, user.shop()?, &range).await?;
    let disposition = format!(
        "attachment; filename=\"orders-{}-{}.csv\"",
        range.from.format("%Y%m%d"),
        range.to.format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
