//! Shop (restaurant) service: public listing and owner settings.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::shop::{Shop, ShopSummary, UpdateShop};

/// Every shop, for the sign-up "join" step.
pub async fn list_public(pool: &PgPool) -> Result<Vec<ShopSummary>, AppError> {
    let shops = sqlx::query_as::<_, ShopSummary>(
        "SELECT id, name, address, image_url FROM shops ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(shops)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Shop, AppError> {
    sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))
}

/// Shops owned by `owner_id`, for the restaurants screen.
pub async fn list_owned(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Shop>, AppError> {
    let shops = sqlx::query_as::<_, Shop>(
        "SELECT * FROM shops WHERE owner_id = $1 ORDER BY created_at ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(shops)
}

/// Update a shop. Only its owner may do so.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    input: &UpdateShop,
) -> Result<Shop, AppError> {
    let existing = find_by_id(pool, id).await?;
    if existing.owner_id != owner_id {
        return Err(AppError::Forbidden(
            "Only the shop owner can change its settings".to_string(),
        ));
    }

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops SET
            name = COALESCE($2, name),
            address = COALESCE($3, address),
            phone = COALESCE($4, phone),
            image_url = COALESCE($5, image_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&input.image_url)
    .fetch_one(pool)
    .await?;

    tracing::info!(shop_id = %id, "Shop settings updated");
    Ok(shop)
}
