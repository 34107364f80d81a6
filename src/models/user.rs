//! User credentials, profiles and the staff roles that drive access control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Cashier,
    Manager,
    Owner,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Cashier, UserRole::Manager, UserRole::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Cashier => "cashier",
            UserRole::Manager => "manager",
            UserRole::Owner => "owner",
        }
    }

    /// Parse a role name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

/// Credential joined with its (possibly missing) profile.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub shop_id: Option<Uuid>,
    pub avatar_url: Option<String>,
}

/// User response DTO. Never carries the password hash or lockout fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub shop_id: Option<Uuid>,
    pub avatar_url: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    /// Build the response for an account; `None` when the profile is missing.
    pub fn from_account(a: Account) -> Option<Self> {
        Some(Self {
            id: a.id,
            email: a.email,
            display_name: a.display_name?,
            phone: a.phone,
            role: a.role?,
            shop_id: a.shop_id,
            avatar_url: a.avatar_url,
            last_login: a.last_login,
            created_at: a.created_at,
        })
    }
}

/// Staff member listed on the settings screen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffMember {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 2, max = 80, message = "must be 2 to 80 characters"))]
    pub display_name: Option<String>,
    #[validate(regex(path = *crate::services::signup::PHONE_RE, message = "is not a valid phone number"))]
    pub phone: Option<String>,
    #[validate(url(message = "must be a URL"))]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStaffRole {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Option<UserRole>) -> Account {
        Account {
            id: Uuid::nil(),
            email: "cook@bistro.test".to_string(),
            password_hash: "secret_hash".to_string(),
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: Utc::now(),
            display_name: role.map(|_| "Cook".to_string()),
            phone: None,
            role,
            shop_id: None,
            avatar_url: None,
        }
    }

    #[test]
    fn user_role_serialization() {
        let json = serde_json::to_string(&UserRole::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
        let role: UserRole = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(role, UserRole::Owner);
    }

    #[test]
    fn user_role_parse_rejects_unknown_names() {
        assert_eq!(UserRole::parse("cashier"), Some(UserRole::Cashier));
        assert_eq!(UserRole::parse("Cashier"), None);
        assert_eq!(UserRole::parse("admin"), None);
    }

    #[test]
    fn user_response_excludes_password() {
        let response = UserResponse::from_account(account(Some(UserRole::Cashier))).unwrap();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn account_without_profile_has_no_response() {
        assert!(UserResponse::from_account(account(None)).is_none());
    }
}
