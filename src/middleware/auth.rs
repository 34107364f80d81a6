//! JWT session extractor for Axum handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use uuid::Uuid;

use crate::errors::{AppError, AuthErrorCode};
use crate::models::user::UserRole;
use crate::services::auth as auth_service;
use crate::AppState;

/// Session of the authenticated caller, taken from a Bearer access token.
///
/// ```ignore
/// async fn handler(current_user: CurrentUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub shop_id: Option<Uuid>,
}

impl CurrentUser {
    /// The caller's shop. Every staff account belongs to one.
    pub fn shop(&self) -> Result<Uuid, AppError> {
        self.shop_id
            .ok_or(AppError::Auth(AuthErrorCode::ProfileIncomplete))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let claims = auth_service::validate_token(bearer.token(), &state.config.jwt_secret)?;

        if claims.token_type != "access" {
            return Err(AppError::Unauthorized);
        }

        let id: Uuid = claims
            .user_id
            .parse()
            .map_err(|_| AppError::Unauthorized)?;

        // Tokens minted before a role rename must not grant anything.
        let role = UserRole::parse(&claims.role).ok_or_else(|| {
            tracing::warn!(user_id = %id, role = %claims.role, "Unknown role in token");
            AppError::Unauthorized
        })?;

        let shop_id = claims
            .shop_id
            .as_deref()
            .map(str::parse::<Uuid>)
            .transpose()
            .map_err(|_| AppError::Unauthorized)?;

        Ok(CurrentUser {
            id,
            email: claims.sub,
            role,
            shop_id,
        })
    }
}
