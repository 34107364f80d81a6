//! Four-step sign-up wizard with guarded transitions and compensated completion.
//!
//! Steps run `BasicInfo → RoleSelection → ProfileDetails → ShopSelection →
//! Complete`. Each step only accepts its own input and only advances once
//! that input validates. Completion writes the credential, the profile and
//! the shop link one after another; every successful write records how to
//! undo it, and a later failure unwinds those writes newest first so no
//! credential is left behind without a profile.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AuthErrorCode};
use crate::models::shop::CreateShop;
use crate::models::user::UserRole;
use crate::services::auth::{hash_password, TokenSubject};

pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-]{7,20}$").expect("phone pattern is valid"));

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignupStep {
    BasicInfo,
    RoleSelection,
    ProfileDetails,
    ShopSelection,
    Complete,
}

impl SignupStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupStep::BasicInfo => "basic_info",
            SignupStep::RoleSelection => "role_selection",
            SignupStep::ProfileDetails => "profile_details",
            SignupStep::ShopSelection => "shop_selection",
            SignupStep::Complete => "complete",
        }
    }

    fn previous(&self) -> Option<SignupStep> {
        match self {
            SignupStep::BasicInfo => None,
            SignupStep::RoleSelection => Some(SignupStep::BasicInfo),
            SignupStep::ProfileDetails => Some(SignupStep::RoleSelection),
            SignupStep::ShopSelection => Some(SignupStep::ProfileDetails),
            SignupStep::Complete => Some(SignupStep::ShopSelection),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BasicInfo {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileDetails {
    #[validate(length(min = 2, max = 80, message = "must be 2 to 80 characters"))]
    pub display_name: String,
    #[validate(regex(path = *PHONE_RE, message = "is not a valid phone number"))]
    pub phone: Option<String>,
    #[validate(url(message = "must be a URL"))]
    pub avatar_url: Option<String>,
}

/// Final step: owners open a new shop, everyone else joins an existing one.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShopSelection {
    Create(CreateShop),
    Join { shop_id: Uuid },
}

/// Input submitted for a single wizard step.
#[derive(Debug, Clone)]
pub enum StepInput {
    BasicInfo(BasicInfo),
    Role(UserRole),
    Profile(ProfileDetails),
    Shop(ShopSelection),
}

impl StepInput {
    fn step(&self) -> SignupStep {
        match self {
            StepInput::BasicInfo(_) => SignupStep::BasicInfo,
            StepInput::Role(_) => SignupStep::RoleSelection,
            StepInput::Profile(_) => SignupStep::ProfileDetails,
            StepInput::Shop(_) => SignupStep::ShopSelection,
        }
    }
}

/// Everything a client has filled in so far.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SignupDraft {
    pub basic_info: Option<BasicInfo>,
    pub role: Option<UserRole>,
    pub profile: Option<ProfileDetails>,
    pub shop: Option<ShopSelection>,
}

/// Where a replayed draft stopped, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SignupProgress {
    pub step: SignupStep,
    pub complete: bool,
    pub error: Option<StepError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for StepError {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(code) => StepError {
                code: code.as_str().to_string(),
                message: code.user_message().to_string(),
            },
            AppError::Validation(msg) => StepError {
                code: "VALIDATION_ERROR".to_string(),
                message: msg.clone(),
            },
            AppError::InvalidTransition(msg) => StepError {
                code: "INVALID_TRANSITION".to_string(),
                message: msg.clone(),
            },
            other => StepError {
                code: "INTERNAL_ERROR".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Reject passwords that are short or lack a letter or a digit.
pub fn check_password_strength(password: &str) -> Result<(), AppError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(AppError::Auth(AuthErrorCode::WeakPassword))
    }
}

#[derive(Debug, Clone)]
pub struct SignupWizard {
    step: SignupStep,
    basic_info: Option<BasicInfo>,
    role: Option<UserRole>,
    profile: Option<ProfileDetails>,
    shop: Option<ShopSelection>,
}

impl Default for SignupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl SignupWizard {
    pub fn new() -> Self {
        Self {
            step: SignupStep::BasicInfo,
            basic_info: None,
            role: None,
            profile: None,
            shop: None,
        }
    }

    pub fn step(&self) -> SignupStep {
        self.step
    }

    /// Submit input for the current step and advance when it is valid.
    pub fn advance(&mut self, input: StepInput) -> Result<SignupStep, AppError> {
        if input.step() != self.step {
            return Err(AppError::InvalidTransition(format!(
                "Cannot submit {} while on {}",
                input.step().as_str(),
                self.step.as_str()
            )));
        }

        match input {
            StepInput::BasicInfo(info) => {
                let info = BasicInfo {
                    email: info.email.trim().to_lowercase(),
                    ..info
                };
                info.validate()?;
                check_password_strength(&info.password)?;
                if info.password != info.confirm_password {
                    return Err(AppError::Validation(
                        "confirm_password: does not match password".to_string(),
                    ));
                }
                self.basic_info = Some(info);
                self.step = SignupStep::RoleSelection;
            }
            StepInput::Role(role) => {
                if self.role != Some(role) {
                    self.shop = None;
                }
                self.role = Some(role);
                self.step = SignupStep::ProfileDetails;
            }
            StepInput::Profile(profile) => {
                profile.validate()?;
                self.profile = Some(profile);
                self.step = SignupStep::ShopSelection;
            }
            StepInput::Shop(selection) => {
                let role = self.role.ok_or_else(|| {
                    AppError::InvalidTransition("Role must be selected first".to_string())
                })?;
                check_shop_selection(role, &selection)?;
                self.shop = Some(selection);
                self.step = SignupStep::Complete;
            }
        }

        Ok(self.step)
    }

    /// Go back one step, keeping what was entered.
    pub fn back(&mut self) -> Result<SignupStep, AppError> {
        let previous = self.step.previous().ok_or_else(|| {
            AppError::InvalidTransition(format!("Cannot go back from {}", self.step.as_str()))
        })?;
        self.step = previous;
        Ok(previous)
    }

    /// Drive a fresh wizard through a draft, stopping at the first gap or error.
    pub fn replay(draft: SignupDraft) -> (Self, Option<AppError>) {
        let mut wizard = Self::new();
        let inputs = [
            draft.basic_info.map(StepInput::BasicInfo),
            draft.role.map(StepInput::Role),
            draft.profile.map(StepInput::Profile),
            draft.shop.map(StepInput::Shop),
        ];
        for input in inputs {
            let Some(input) = input else {
                return (wizard, None);
            };
            if let Err(err) = wizard.advance(input) {
                return (wizard, Some(err));
            }
        }
        (wizard, None)
    }

    pub fn progress(&self, error: Option<&AppError>) -> SignupProgress {
        SignupProgress {
            step: self.step,
            complete: self.step == SignupStep::Complete,
            error: error.map(StepError::from),
        }
    }

    /// Consume a finished wizard into the writes it needs.
    pub fn into_plan(self) -> Result<SignupPlan, AppError> {
        match (self.step, self.basic_info, self.role, self.profile, self.shop) {
            (SignupStep::Complete, Some(basic), Some(role), Some(profile), Some(shop)) => {
                Ok(SignupPlan {
                    email: basic.email,
                    password: basic.password,
                    role,
                    profile,
                    shop,
                })
            }
            (step, ..) => Err(AppError::InvalidTransition(format!(
                "Sign-up is not complete (currently on {})",
                step.as_str()
            ))),
        }
    }
}

fn check_shop_selection(role: UserRole, selection: &ShopSelection) -> Result<(), AppError> {
    match (role, selection) {
        (UserRole::Owner, ShopSelection::Create(shop)) => {
            shop.validate()?;
            Ok(())
        }
        (UserRole::Owner, ShopSelection::Join { .. }) => Err(AppError::Validation(
            "shop: owners must create a new shop".to_string(),
        )),
        (_, ShopSelection::Create(_)) => Err(AppError::Validation(
            "shop: only owners can create a shop".to_string(),
        )),
        (_, ShopSelection::Join { .. }) => Ok(()),
    }
}

/// Validated data ready to be written.
#[derive(Debug, Clone)]
pub struct SignupPlan {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub profile: ProfileDetails,
    pub shop: ShopSelection,
}

/// Undo step for a write that already succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    DeleteCredential(Uuid),
    DeleteProfile(Uuid),
    DeleteShop(Uuid),
}

#[derive(Debug, Default)]
pub struct CompensationLog {
    actions: Vec<Compensation>,
}

impl CompensationLog {
    pub fn record(&mut self, action: Compensation) {
        self.actions.push(action);
    }

    /// Actions in the order they must run: newest write first.
    pub fn unwind_order(&self) -> impl Iterator<Item = Compensation> + '_ {
        self.actions.iter().rev().copied()
    }

    async fn unwind(&self, pool: &PgPool) {
        for action in self.unwind_order() {
            let result = match action {
                Compensation::DeleteShop(id) => sqlx::query("DELETE FROM shops WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await,
                Compensation::DeleteProfile(id) => {
                    sqlx::query("DELETE FROM profiles WHERE user_id = $1")
                        .bind(id)
                        .execute(pool)
                        .await
                }
                Compensation::DeleteCredential(id) => {
                    sqlx::query("DELETE FROM users WHERE id = $1")
                        .bind(id)
                        .execute(pool)
                        .await
                }
            };
            match result {
                Ok(_) => tracing::info!(?action, "Sign-up write rolled back"),
                Err(e) => tracing::error!(?action, error = %e, "Sign-up rollback failed"),
            }
        }
    }
}

/// Result of a completed sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct SignupOutcome {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub shop_id: Uuid,
}

impl SignupOutcome {
    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
            shop_id: Some(self.shop_id),
        }
    }
}

/// Write the account, profile and shop link, unwinding on failure.
pub async fn complete(pool: &PgPool, plan: SignupPlan) -> Result<SignupOutcome, AppError> {
    let mut log = CompensationLog::default();
    match execute(pool, &plan, &mut log).await {
        Ok(outcome) => {
            tracing::info!(
                user_id = %outcome.user_id,
                shop_id = %outcome.shop_id,
                role = outcome.role.as_str(),
                "Sign-up completed"
            );
            Ok(outcome)
        }
        Err(err) => {
            tracing::warn!(email = %plan.email, error = %err, "Sign-up failed, rolling back");
            log.unwind(pool).await;
            Err(err)
        }
    }
}

async fn execute(
    pool: &PgPool,
    plan: &SignupPlan,
    log: &mut CompensationLog,
) -> Result<SignupOutcome, AppError> {
    let password_hash = hash_password(&plan.password)?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(&plan.email)
    .bind(&password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Auth(AuthErrorCode::EmailAlreadyInUse)
        }
        _ => AppError::Database(e),
    })?;
    log.record(Compensation::DeleteCredential(user_id));

    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, display_name, phone, role, avatar_url)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(plan.profile.display_name.trim())
    .bind(&plan.profile.phone)
    .bind(plan.role)
    .bind(&plan.profile.avatar_url)
    .execute(pool)
    .await?;
    log.record(Compensation::DeleteProfile(user_id));

    let shop_id = match &plan.shop {
        ShopSelection::Create(shop) => {
            let shop_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO shops (name, address, phone, image_url, owner_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(shop.name.trim())
            .bind(&shop.address)
            .bind(&shop.phone)
            .bind(&shop.image_url)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
            log.record(Compensation::DeleteShop(shop_id));
            shop_id
        }
        ShopSelection::Join { shop_id } => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM shops WHERE id = $1)")
                    .bind(shop_id)
                    .fetch_one(pool)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Shop not found".to_string()));
            }
            *shop_id
        }
    };

    sqlx::query("UPDATE profiles SET shop_id = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(shop_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(SignupOutcome {
        user_id,
        email: plan.email.clone(),
        role: plan.role,
        shop_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> BasicInfo {
        BasicInfo {
            email: "  Chef@Bistro.Test ".to_string(),
            password: "Saffron2024".to_string(),
            confirm_password: "Saffron2024".to_string(),
        }
    }

    fn profile() -> ProfileDetails {
        ProfileDetails {
            display_name: "Ana Chef".to_string(),
            phone: Some("+1 (555) 010-2030".to_string()),
            avatar_url: None,
        }
    }

    fn new_shop() -> ShopSelection {
        ShopSelection::Create(CreateShop {
            name: "Corner Bistro".to_string(),
            address: Some("1 Main St".to_string()),
            phone: None,
            image_url: None,
        })
    }

    #[test]
    fn wizard_walks_all_steps_in_order() {
        let mut wizard = SignupWizard::new();
        assert_eq!(wizard.step(), SignupStep::BasicInfo);
        assert_eq!(
            wizard.advance(StepInput::BasicInfo(basic())).unwrap(),
            SignupStep::RoleSelection
        );
        assert_eq!(
            wizard.advance(StepInput::Role(UserRole::Owner)).unwrap(),
            SignupStep::ProfileDetails
        );
        assert_eq!(
            wizard.advance(StepInput::Profile(profile())).unwrap(),
            SignupStep::ShopSelection
        );
        assert_eq!(
            wizard.advance(StepInput::Shop(new_shop())).unwrap(),
            SignupStep::Complete
        );

        let plan = wizard.into_plan().unwrap();
        assert_eq!(plan.email, "chef@bistro.test");
        assert_eq!(plan.role, UserRole::Owner);
    }

    #[test]
    fn out_of_order_input_is_an_invalid_transition() {
        let mut wizard = SignupWizard::new();
        let err = wizard.advance(StepInput::Role(UserRole::Cashier)).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        assert_eq!(wizard.step(), SignupStep::BasicInfo);
    }

    #[test]
    fn weak_password_blocks_first_step() {
        let mut wizard = SignupWizard::new();
        let info = BasicInfo {
            password: "short1".to_string(),
            confirm_password: "short1".to_string(),
            ..basic()
        };
        let err = wizard.advance(StepInput::BasicInfo(info)).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthErrorCode::WeakPassword)));
        assert_eq!(wizard.step(), SignupStep::BasicInfo);
        assert!(check_password_strength("lettersonly").is_err());
        assert!(check_password_strength("12345678").is_err());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut wizard = SignupWizard::new();
        let info = BasicInfo {
            confirm_password: "Saffron2025".to_string(),
            ..basic()
        };
        assert!(matches!(
            wizard.advance(StepInput::BasicInfo(info)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let mut wizard = SignupWizard::new();
        let info = BasicInfo {
            email: "not-an-email".to_string(),
            ..basic()
        };
        assert!(matches!(
            wizard.advance(StepInput::BasicInfo(info)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn profile_requires_display_name_and_valid_phone() {
        let (mut wizard, err) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            role: Some(UserRole::Cashier),
            ..Default::default()
        });
        assert!(err.is_none());
        let bad = ProfileDetails {
            display_name: "A".to_string(),
            phone: Some("call me".to_string()),
            avatar_url: None,
        };
        assert!(wizard.advance(StepInput::Profile(bad)).is_err());
        assert_eq!(wizard.step(), SignupStep::ProfileDetails);
    }

    #[test]
    fn owners_create_and_staff_join() {
        let (mut owner, _) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            role: Some(UserRole::Owner),
            profile: Some(profile()),
            shop: None,
        });
        assert!(owner
            .advance(StepInput::Shop(ShopSelection::Join { shop_id: Uuid::nil() }))
            .is_err());

        let (mut cashier, _) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            role: Some(UserRole::Cashier),
            profile: Some(profile()),
            shop: None,
        });
        assert!(cashier.advance(StepInput::Shop(new_shop())).is_err());
        assert_eq!(
            cashier
                .advance(StepInput::Shop(ShopSelection::Join { shop_id: Uuid::nil() }))
                .unwrap(),
            SignupStep::Complete
        );
    }

    #[test]
    fn back_keeps_data_and_refuses_from_first_step() {
        let mut wizard = SignupWizard::new();
        assert!(wizard.back().is_err());
        wizard.advance(StepInput::BasicInfo(basic())).unwrap();
        wizard.advance(StepInput::Role(UserRole::Manager)).unwrap();
        assert_eq!(wizard.back().unwrap(), SignupStep::RoleSelection);
        assert_eq!(
            wizard.advance(StepInput::Role(UserRole::Manager)).unwrap(),
            SignupStep::ProfileDetails
        );
    }

    #[test]
    fn changing_role_clears_shop_choice() {
        let (mut wizard, err) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            role: Some(UserRole::Owner),
            profile: Some(profile()),
            shop: Some(new_shop()),
        });
        assert!(err.is_none());
        assert_eq!(wizard.step(), SignupStep::Complete);

        wizard.back().unwrap();
        wizard.back().unwrap();
        assert_eq!(wizard.back().unwrap(), SignupStep::RoleSelection);
        assert!(wizard.shop.is_some());

        wizard.advance(StepInput::Role(UserRole::Cashier)).unwrap();
        assert!(wizard.shop.is_none());
    }

    #[test]
    fn replay_reports_where_it_stopped() {
        let (wizard, err) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            role: None,
            profile: Some(profile()),
            shop: None,
        });
        assert!(err.is_none());
        let progress = wizard.progress(None);
        assert_eq!(progress.step, SignupStep::RoleSelection);
        assert!(!progress.complete);

        let (wizard, err) = SignupWizard::replay(SignupDraft {
            basic_info: Some(BasicInfo {
                password: "weak".to_string(),
                confirm_password: "weak".to_string(),
                ..basic()
            }),
            ..Default::default()
        });
        let progress = wizard.progress(err.as_ref());
        assert_eq!(progress.step, SignupStep::BasicInfo);
        assert_eq!(progress.error.unwrap().code, "weak_password");
    }

    #[test]
    fn incomplete_wizard_has_no_plan() {
        let (wizard, _) = SignupWizard::replay(SignupDraft {
            basic_info: Some(basic()),
            ..Default::default()
        });
        assert!(matches!(
            wizard.into_plan(),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn compensations_unwind_newest_first() {
        let user = Uuid::new_v4();
        let shop = Uuid::new_v4();
        let mut log = CompensationLog::default();
        log.record(Compensation::DeleteCredential(user));
        log.record(Compensation::DeleteProfile(user));
        log.record(Compensation::DeleteShop(shop));

        let order: Vec<Compensation> = log.unwind_order().collect();
        assert_eq!(
            order,
            vec![
                Compensation::DeleteShop(shop),
                Compensation::DeleteProfile(user),
                Compensation::DeleteCredential(user),
            ]
        );
    }

    #[test]
    fn shop_selection_deserializes_by_mode() {
        let join: ShopSelection = serde_json::from_value(serde_json::json!({
            "mode": "join",
            "shop_id": Uuid::nil()
        }))
        .unwrap();
        assert!(matches!(join, ShopSelection::Join { .. }));

        let create: ShopSelection = serde_json::from_value(serde_json::json!({
            "mode": "create",
            "name": "Noodle Bar"
        }))
        .unwrap();
        assert!(matches!(create, ShopSelection::Create(ref s) if s.name == "Noodle Bar"));
    }
}
