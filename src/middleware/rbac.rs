//! Role-based access control extractors for Axum handlers.
//!
//! API routes are gated by the client screen they serve, using the same
//! role table the client uses to show or hide that screen.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserRole;
use crate::services::access::{self, screens};
use crate::AppState;

/// A client screen whose access rule guards a group of endpoints.
pub trait Screen {
    const PATH: &'static str;
}

macro_rules! screen {
    ($name:ident, $path:expr) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Screen for $name {
            const PATH: &'static str = $path;
        }
    };
}

screen!(Dashboard, screens::DASHBOARD);
screen!(Orders, screens::ORDERS);
screen!(Menu, screens::MENU);
screen!(Analytics, screens::ANALYTICS);
screen!(Inventory, screens::INVENTORY);
screen!(Messages, screens::MESSAGES);
screen!(Settings, screens::SETTINGS);
screen!(AddItems, screens::ADD_ITEMS);
screen!(Notifications, screens::NOTIFICATIONS);
screen!(Restaurants, screens::RESTAURANTS);

/// Extractor that requires the caller's role to have access to screen `S`.
#[derive(Debug, Clone)]
pub struct RequireScreen<S: Screen>(pub CurrentUser, pub PhantomData<S>);

impl<S: Screen> RequireScreen<S> {
    pub fn user(&self) -> &CurrentUser {
        &self.0
    }
}

impl<S: Screen + Send> FromRequestParts<AppState> for RequireScreen<S> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !access::has_access(Some(user.role), S::PATH) {
            tracing::debug!(user_id = %user.id, role = user.role.as_str(), screen = S::PATH, "Screen denied");
            return Err(AppError::Forbidden(format!(
                "Your role does not have access to {}",
                S::PATH
            )));
        }
        Ok(RequireScreen(user, PhantomData))
    }
}

/// Extractor that requires Manager or Owner role.
#[derive(Debug, Clone)]
pub struct RequireManager(pub CurrentUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        match user.role {
            UserRole::Manager | UserRole::Owner => Ok(RequireManager(user)),
            UserRole::Cashier => Err(AppError::Forbidden(
                "Manager or owner access required".to_string(),
            )),
        }
    }
}

/// Extractor that requires the Owner role.
#[derive(Debug, Clone)]
pub struct RequireOwner(pub CurrentUser);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Owner {
            return Err(AppError::Forbidden("Owner access required".to_string()));
        }
        Ok(RequireOwner(user))
    }
}
