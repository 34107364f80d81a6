//! Menu category CRUD, scoped to a shop.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::category::{Category, CreateCategory, UpdateCategory};

fn name_conflict(e: sqlx::Error, name: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Category '{name}' already exists"))
        }
        _ => AppError::Database(e),
    }
}

pub async fn list(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Category>, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE shop_id = $1 ORDER BY sort_order ASC, name ASC",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

pub async fn find_by_id(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

pub async fn create(
    pool: &PgPool,
    shop_id: Uuid,
    input: &CreateCategory,
) -> Result<Category, AppError> {
    let name = input.name.trim();
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (shop_id, name, sort_order)
        VALUES ($1, $2, COALESCE($3, 0))
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(name)
    .bind(input.sort_order)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e, name))
}

pub async fn update(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
    input: &UpdateCategory,
) -> Result<Category, AppError> {
    find_by_id(pool, shop_id, id).await?;
    let name = input.name.as_deref().map(str::trim);

    sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories SET
            name = COALESCE($3, name),
            sort_order = COALESCE($4, sort_order),
            updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .bind(name)
    .bind(input.sort_order)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e, name.unwrap_or_default()))
}

/// Delete a category. Its products become uncategorised.
pub async fn delete(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }
    Ok(())
}
