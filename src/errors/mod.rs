//! Unified error handling with consistent API response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Fallback shown when neither a known code nor a raw message is available.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Error detail in the API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Consistent JSON envelope for all API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a successful result in the envelope.
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }

    /// Wrap an error in the envelope.
    pub fn error(code: &str, message: &str) -> Json<Self> {
        Json(Self {
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        })
    }
}

/// Authentication and account failures that carry a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidCredential,
    EmailAlreadyInUse,
    WeakPassword,
    TooManyRequests,
    NetworkRequestFailed,
    UserNotFound,
    PermissionDenied,
    NotFound,
    ProfileIncomplete,
}

impl AuthErrorCode {
    const ALL: [AuthErrorCode; 9] = [
        Self::InvalidCredential,
        Self::EmailAlreadyInUse,
        Self::WeakPassword,
        Self::TooManyRequests,
        Self::NetworkRequestFailed,
        Self::UserNotFound,
        Self::PermissionDenied,
        Self::NotFound,
        Self::ProfileIncomplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid_credential",
            Self::EmailAlreadyInUse => "email_already_in_use",
            Self::WeakPassword => "weak_password",
            Self::TooManyRequests => "too_many_requests",
            Self::NetworkRequestFailed => "network_request_failed",
            Self::UserNotFound => "user_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::ProfileIncomplete => "profile_incomplete",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidCredential => "Invalid email or password.",
            Self::EmailAlreadyInUse => "An account with this email already exists.",
            Self::WeakPassword => {
                "Password is too weak. Use at least 8 characters with letters and numbers."
            }
            Self::TooManyRequests => "Too many attempts. Please try again later.",
            Self::NetworkRequestFailed => "Network error. Check your connection and try again.",
            Self::UserNotFound => "No account found with this email.",
            Self::PermissionDenied => "You do not have permission to perform this action.",
            Self::NotFound => "The requested item could not be found.",
            Self::ProfileIncomplete => {
                "Your account setup is incomplete. Please contact your manager."
            }
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Self::InvalidCredential | Self::UserNotFound | Self::ProfileIncomplete => {
                StatusCode::UNAUTHORIZED
            }
            Self::EmailAlreadyInUse => StatusCode::CONFLICT,
            Self::WeakPassword => StatusCode::BAD_REQUEST,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::NetworkRequestFailed => StatusCode::SERVICE_UNAVAILABLE,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// Translate an error code into the message shown to users.
///
/// Unknown codes fall back to the raw message, then to a generic string.
pub fn user_message_for(code: &str, raw: Option<&str>) -> String {
    if let Some(known) = AuthErrorCode::from_code(code) {
        return known.user_message().to_string();
    }
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        Some(message) => message.to_string(),
        None => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

/// Application error type mapping to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Authentication error: {}", .0.as_str())]
    Auth(AuthErrorCode),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Auth(AuthErrorCode::NotFound))
    }

    /// Check if this error represents an auth failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::Auth(
                    AuthErrorCode::InvalidCredential
                        | AuthErrorCode::UserNotFound
                        | AuthErrorCode::ProfileIncomplete
                )
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field}: {detail}")
            })
            .collect();
        fields.sort();
        AppError::Validation(fields.join("; "))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InvalidTransition(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_TRANSITION", msg.clone())
            }
            AppError::Auth(code) => {
                tracing::debug!(code = code.as_str(), "Authentication error");
                (code.status(), code.as_str(), code.user_message().to_string())
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()> {
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success() {
        let response = ApiResponse::success("hello");
        let json = serde_json::to_value(&response.0).unwrap();
        assert_eq!(json["data"], "hello");
        assert!(json["error"].is_null());
    }

    #[test]
    fn api_response_error() {
        let response = ApiResponse::<()>::error("NOT_FOUND", "Order not found");
        let json = serde_json::to_value(&response.0).unwrap();
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Order not found");
    }

    #[test]
    fn app_error_is_not_found() {
        let err = AppError::NotFound("order".to_string());
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
        assert!(AppError::Auth(AuthErrorCode::InvalidCredential).is_unauthorized());
    }

    #[test]
    fn app_error_display() {
        let err = AppError::Validation("email is required".to_string());
        assert_eq!(err.to_string(), "Validation error: email is required");
        let err = AppError::Auth(AuthErrorCode::WeakPassword);
        assert_eq!(err.to_string(), "Authentication error: weak_password");
    }

    #[test]
    fn app_error_from_sqlx() {
        let sqlx_err = sqlx::Error::RowNotFound;
        let err: AppError = sqlx_err.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn known_codes_map_to_friendly_messages() {
        assert_eq!(
            user_message_for("email_already_in_use", Some("duplicate key")),
            "An account with this email already exists."
        );
        assert_eq!(
            user_message_for("too_many_requests", None),
            "Too many attempts. Please try again later."
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_raw_then_generic() {
        assert_eq!(user_message_for("quota_exceeded", Some("Quota hit")), "Quota hit");
        assert_eq!(user_message_for("quota_exceeded", Some("  ")), GENERIC_ERROR_MESSAGE);
        assert_eq!(user_message_for("quota_exceeded", None), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn every_code_round_trips_through_its_string() {
        for code in AuthErrorCode::ALL {
            assert_eq!(AuthErrorCode::from_code(code.as_str()), Some(code));
        }
    }

    #[test]
    fn auth_errors_use_their_own_status() {
        let response = AppError::Auth(AuthErrorCode::TooManyRequests).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let response = AppError::Auth(AuthErrorCode::EmailAlreadyInUse).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
