//! Menu category model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: String,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 60, message = "must be 1 to 60 characters"))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
}
