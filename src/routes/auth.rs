//! Authentication routes: sign-up wizard, login, refresh, logout, profile.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiResponse, AppError, AuthErrorCode};
use crate::middleware::auth::CurrentUser;
use crate::models::user::{ChangePassword, UpdateProfile, UserResponse};
use crate::services::auth::{self as auth_service, TokenPair};
use crate::services::signup::{self, SignupDraft, SignupOutcome, SignupProgress, SignupWizard};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub account: SignupOutcome,
    pub tokens: TokenPair,
}

fn profile_response(account: crate::models::user::Account) -> Result<UserResponse, AppError> {
    UserResponse::from_account(account).ok_or(AppError::Auth(AuthErrorCode::ProfileIncomplete))
}

/// POST /api/v1/auth/signup/validate
///
/// Replays a draft through the wizard and reports the step it reached.
pub async fn signup_validate(
    Json(draft): Json<SignupDraft>,
) -> Json<ApiResponse<SignupProgress>> {
    let (wizard, error) = SignupWizard::replay(draft);
    ApiResponse::success(wizard.progress(error.as_ref()))
}

/// POST /api/v1/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(draft): Json<SignupDraft>,
) -> Result<Json<ApiResponse<SignupResponse>>, AppError> {
    let (wizard, error) = SignupWizard::replay(draft);
    if let Some(err) = error {
        return Err(err);
    }
    let plan = wizard.into_plan()?;
    let account = signup::complete(&state.db, plan).await?;

    let tokens = auth_service::generate_tokens(
        &account.token_subject(),
        &state.config.jwt_secret,
        state.config.jwt_access_token_expiry_secs,
        state.config.jwt_refresh_token_expiry_secs,
    )?;
    Ok(ApiResponse::success(SignupResponse { account, tokens }))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let tokens = auth_service::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_access_token_expiry_secs,
        state.config.jwt_refresh_token_expiry_secs,
    )
    .await?;

    Ok(ApiResponse::success(tokens))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let tokens = auth_service::refresh_token(
        &state.db,
        &body.refresh_token,
        &state.config.jwt_secret,
        state.config.jwt_access_token_expiry_secs,
        state.config.jwt_refresh_token_expiry_secs,
    )
    .await?;

    Ok(ApiResponse::success(tokens))
}

/// POST /api/v1/auth/logout
pub async fn logout() -> Json<ApiResponse<&'static str>> {
    // Stateless JWT: the client discards its tokens.
    ApiResponse::success("Logged out successfully")
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let account = auth_service::find_account_by_id(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(profile_response(account)?))
}

/// PUT /api/v1/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    body.validate()?;
    let account = auth_service::update_profile(&state.db, current_user.id, &body).await?;
    Ok(ApiResponse::success(profile_response(account)?))
}

/// PUT /api/v1/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<ChangePassword>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::change_password(
        &state.db,
        current_user.id,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(ApiResponse::success("Password changed"))
}
