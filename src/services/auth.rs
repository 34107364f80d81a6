//! Authentication service: password hashing, JWT sessions, login and account upkeep.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, AuthErrorCode};
use crate::models::user::{Account, StaffMember, UpdateProfile, UserRole};
use crate::services::signup::check_password_strength;

/// Maximum failed login attempts before account lockout.
const MAX_FAILED_ATTEMPTS: i32 = 3;

/// Lockout duration in minutes after exceeding max failed attempts.
const LOCKOUT_DURATION_MINUTES: i64 = 30;

const ACCOUNT_SELECT: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.failed_login_attempts, u.locked_until,
           u.last_login, u.created_at,
           p.display_name, p.phone, p.role, p.shop_id, p.avatar_url
    FROM users u
    LEFT JOIN profiles p ON p.user_id = u.id
"#;

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub role: String,
    pub shop_id: Option<String>,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Identity written into a token pair.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub shop_id: Option<Uuid>,
}

impl TokenSubject {
    /// Subject for an account; accounts without a profile cannot hold a session.
    pub fn from_account(account: &Account) -> Result<Self, AppError> {
        let role = account
            .role
            .ok_or(AppError::Auth(AuthErrorCode::ProfileIncomplete))?;
        Ok(Self {
            user_id: account.id,
            email: account.email.clone(),
            role,
            shop_id: account.shop_id,
        })
    }
}

/// Token pair returned on successful login or sign-up.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Hash a plaintext password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a JWT token pair (access + refresh).
pub fn generate_tokens(
    subject: &TokenSubject,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let now = Utc::now();
    let encoding_key = EncodingKey::from_secret(jwt_secret.as_bytes());

    let claims_for = |token_type: &str, expiry_secs: i64| Claims {
        sub: subject.email.clone(),
        user_id: subject.user_id.to_string(),
        role: subject.role.as_str().to_string(),
        shop_id: subject.shop_id.map(|id| id.to_string()),
        token_type: token_type.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let access_token = jsonwebtoken::encode(
        &Header::default(),
        &claims_for("access", access_expiry_secs),
        &encoding_key,
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    let refresh_token = jsonwebtoken::encode(
        &Header::default(),
        &claims_for("refresh", refresh_expiry_secs),
        &encoding_key,
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: access_expiry_secs,
    })
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::default();

    jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Find an account (credential + profile) by email.
pub async fn find_account_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, AppError> {
    let sql = format!("{ACCOUNT_SELECT} WHERE u.email = $1");
    let account = sqlx::query_as::<_, Account>(&sql)
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(account)
}

/// Find an account by user ID.
pub async fn find_account_by_id(pool: &PgPool, id: Uuid) -> Result<Account, AppError> {
    let sql = format!("{ACCOUNT_SELECT} WHERE u.id = $1");
    sqlx::query_as::<_, Account>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Auth(AuthErrorCode::UserNotFound))
}

/// Authenticate by email and password, returning a token pair.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let account = find_account_by_email(pool, email)
        .await?
        .ok_or(AppError::Auth(AuthErrorCode::InvalidCredential))?;

    if let Some(locked_until) = account.locked_until {
        if locked_until > Utc::now() {
            tracing::warn!(user_id = %account.id, "Login attempt on locked account");
            return Err(AppError::Auth(AuthErrorCode::TooManyRequests));
        }
    }

    if !verify_password(password, &account.password_hash)? {
        let new_attempts = account.failed_login_attempts + 1;
        if new_attempts >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + Duration::minutes(LOCKOUT_DURATION_MINUTES);
            sqlx::query(
                "UPDATE users SET failed_login_attempts = $1, locked_until = $2 WHERE id = $3",
            )
            .bind(new_attempts)
            .bind(lock_until)
            .bind(account.id)
            .execute(pool)
            .await?;
            tracing::warn!(user_id = %account.id, until = %lock_until, "Account locked");
        } else {
            sqlx::query("UPDATE users SET failed_login_attempts = $1 WHERE id = $2")
                .bind(new_attempts)
                .bind(account.id)
                .execute(pool)
                .await?;
        }
        return Err(AppError::Auth(AuthErrorCode::InvalidCredential));
    }

    let subject = TokenSubject::from_account(&account)?;

    sqlx::query(
        "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, last_login = NOW() WHERE id = $1",
    )
    .bind(account.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %account.id, role = subject.role.as_str(), "User logged in");
    generate_tokens(&subject, jwt_secret, access_expiry_secs, refresh_expiry_secs)
}

/// Refresh an access token using a valid refresh token.
///
/// Role and shop are re-read so that staff changes apply on refresh.
pub async fn refresh_token(
    pool: &PgPool,
    refresh_token_str: &str,
    jwt_secret: &str,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
) -> Result<TokenPair, AppError> {
    let claims = validate_token(refresh_token_str, jwt_secret)?;

    if claims.token_type != "refresh" {
        return Err(AppError::Unauthorized);
    }

    let user_id: Uuid = claims
        .user_id
        .parse()
        .map_err(|_| AppError::Unauthorized)?;

    let account = find_account_by_id(pool, user_id)
        .await
        .map_err(|_| AppError::Unauthorized)?;
    let subject = TokenSubject::from_account(&account)?;

    generate_tokens(&subject, jwt_secret, access_expiry_secs, refresh_expiry_secs)
}

/// Update the caller's own profile fields.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    input: &UpdateProfile,
) -> Result<Account, AppError> {
    let updated = sqlx::query(
        r#"
        UPDATE profiles SET
            display_name = COALESCE($2, display_name),
            phone = COALESCE($3, phone),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&input.display_name)
    .bind(&input.phone)
    .bind(&input.avatar_url)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Auth(AuthErrorCode::ProfileIncomplete));
    }

    find_account_by_id(pool, user_id).await
}

/// Change the caller's password after verifying the current one.
pub async fn change_password(
    pool: &PgPool,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let account = find_account_by_id(pool, user_id).await?;

    if !verify_password(current_password, &account.password_hash)? {
        return Err(AppError::Auth(AuthErrorCode::InvalidCredential));
    }
    check_password_strength(new_password)?;

    let hash = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&hash)
        .bind(user_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

/// List staff attached to a shop.
pub async fn list_staff(pool: &PgPool, shop_id: Uuid) -> Result<Vec<StaffMember>, AppError> {
    let staff = sqlx::query_as::<_, StaffMember>(
        r#"
        SELECT p.user_id, u.email, p.display_name, p.phone, p.role, p.created_at
        FROM profiles p
        INNER JOIN users u ON u.id = p.user_id
        WHERE p.shop_id = $1
        ORDER BY p.role DESC, p.display_name ASC
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(staff)
}

/// Change a staff member's role. Owners cannot change their own role.
pub async fn update_staff_role(
    pool: &PgPool,
    shop_id: Uuid,
    actor_id: Uuid,
    target_id: Uuid,
    role: UserRole,
) -> Result<StaffMember, AppError> {
    if actor_id == target_id {
        return Err(AppError::Forbidden(
            "You cannot change your own role".to_string(),
        ));
    }

    let updated = sqlx::query(
        "UPDATE profiles SET role = $1, updated_at = NOW() WHERE user_id = $2 AND shop_id = $3",
    )
    .bind(role)
    .bind(target_id)
    .bind(shop_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Staff member not found".to_string()));
    }

    tracing::info!(actor = %actor_id, target = %target_id, role = role.as_str(), "Staff role changed");

    list_staff(pool, shop_id)
        .await?
        .into_iter()
        .find(|s| s.user_id == target_id)
        .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(role: UserRole) -> TokenSubject {
        TokenSubject {
            user_id: Uuid::new_v4(),
            email: "cashier@bistro.test".to_string(),
            role,
            shop_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn password_hash_and_verify() {
        let password = "Espresso42";
        let hash = hash_password(password).unwrap();
        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("Decaf42", &hash).unwrap());
    }

    #[test]
    fn token_generation_and_validation() {
        let subject = subject(UserRole::Cashier);
        let secret = "test-secret-key-for-jwt";
        let tokens = generate_tokens(&subject, secret, 900, 604800).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);

        let claims = validate_token(&tokens.access_token, secret).unwrap();
        assert_eq!(claims.sub, "cashier@bistro.test");
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.role, "cashier");
        assert_eq!(claims.shop_id, subject.shop_id.map(|id| id.to_string()));

        let refresh_claims = validate_token(&tokens.refresh_token, secret).unwrap();
        assert_eq!(refresh_claims.token_type, "refresh");
    }

    #[test]
    fn invalid_token_rejected() {
        assert!(validate_token("garbage.token.here", "secret").is_err());
    }

    #[test]
    fn token_signed_with_other_secret_rejected() {
        let tokens = generate_tokens(&subject(UserRole::Owner), "one", 900, 900).unwrap();
        assert!(validate_token(&tokens.access_token, "two").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Expired well beyond the 60s leeway window
        let tokens = generate_tokens(&subject(UserRole::Manager), "test-secret", -3600, -3600).unwrap();
        assert!(validate_token(&tokens.access_token, "test-secret").is_err());
    }

    #[test]
    fn account_without_profile_cannot_get_a_session() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "orphan@bistro.test".to_string(),
            password_hash: "h".to_string(),
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: Utc::now(),
            display_name: None,
            phone: None,
            role: None,
            shop_id: None,
            avatar_url: None,
        };
        let err = TokenSubject::from_account(&account).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthErrorCode::ProfileIncomplete)));
    }
}
