//! Screen access routes: what the caller's role may open.

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};

use crate::errors::ApiResponse;
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserRole;
use crate::services::access;

#[derive(Debug, Serialize)]
pub struct RoleRoutes {
    pub role: UserRole,
    pub routes: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct AccessDecision {
    pub path: String,
    pub allowed: bool,
}

/// GET /api/v1/access/routes
pub async fn routes(current_user: CurrentUser) -> Json<ApiResponse<RoleRoutes>> {
    ApiResponse::success(RoleRoutes {
        role: current_user.role,
        routes: access::role_access(current_user.role),
    })
}

/// GET /api/v1/access/check?path=/dashboard
pub async fn check(
    current_user: CurrentUser,
    Query(query): Query<AccessQuery>,
) -> Json<ApiResponse<AccessDecision>> {
    let allowed = access::has_access(Some(current_user.role), &query.path);
    ApiResponse::success(AccessDecision {
        path: query.path,
        allowed,
    })
}
