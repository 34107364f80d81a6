//! Shop (restaurant) tenant model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public listing entry used when joining an existing shop.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShopSummary {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShop {
    #[validate(length(min = 2, max = 120, message = "must be 2 to 120 characters"))]
    pub name: String,
    #[validate(length(max = 250, message = "must be at most 250 characters"))]
    pub address: Option<String>,
    #[validate(regex(path = *crate::services::signup::PHONE_RE, message = "is not a valid phone number"))]
    pub phone: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
pub struct UpdateShop {
    #[validate(length(min = 2, max = 120, message = "must be 2 to 120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 250, message = "must be at most 250 characters"))]
    pub address: Option<String>,
    #[validate(regex(path = *crate::services::signup::PHONE_RE, message = "is not a valid phone number"))]
    pub phone: Option<String>,
    pub image_url: Option<String>,
}
