//! Menu product service.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::{CreateProduct, Product, ProductFilters, UpdateProduct};
use crate::services::category;

fn check_price(price: Option<Decimal>) -> Result<(), AppError> {
    match price {
        Some(p) if p.is_sign_negative() => Err(AppError::Validation(
            "price: must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// A product may only be filed under one of its own shop's categories.
async fn check_category(
    pool: &PgPool,
    shop_id: Uuid,
    category_id: Option<Uuid>,
) -> Result<(), AppError> {
    if let Some(id) = category_id {
        category::find_by_id(pool, shop_id, id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => {
                    AppError::Validation("category_id: unknown category".to_string())
                }
                other => other,
            })?;
    }
    Ok(())
}

/// List a shop's products with optional filters.
pub async fn list(
    pool: &PgPool,
    shop_id: Uuid,
    filters: &ProductFilters,
) -> Result<Vec<Product>, AppError> {
    let mut conditions = vec!["shop_id = $1".to_string()];
    let mut param_index = 1u32;

    if filters.category_id.is_some() {
        param_index += 1;
        conditions.push(format!("category_id = ${param_index}"));
    }
    if filters.available.is_some() {
        param_index += 1;
        conditions.push(format!("is_available = ${param_index}"));
    }
    if filters.search.is_some() {
        param_index += 1;
        conditions.push(format!(
            "(name ILIKE ${param_index} OR description ILIKE ${param_index})"
        ));
    }

    let sql = format!(
        "SELECT * FROM products WHERE {} ORDER BY name ASC",
        conditions.join(" AND ")
    );
    let mut query = sqlx::query_as::<_, Product>(&sql).bind(shop_id);
    if let Some(category_id) = filters.category_id {
        query = query.bind(category_id);
    }
    if let Some(available) = filters.available {
        query = query.bind(available);
    }
    if let Some(ref search) = filters.search {
        query = query.bind(format!("%{search}%"));
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<Product, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Available products among `ids`, used to price a cart.
pub async fn find_available(
    pool: &PgPool,
    shop_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Product>, AppError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE shop_id = $1 AND id = ANY($2) AND is_available = true",
    )
    .bind(shop_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn create(
    pool: &PgPool,
    shop_id: Uuid,
    input: &CreateProduct,
) -> Result<Product, AppError> {
    check_price(Some(input.price))?;
    check_category(pool, shop_id, input.category_id).await?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (shop_id, category_id, name, description, price, image_url, is_available)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, true))
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(input.category_id)
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.image_url)
    .bind(input.is_available)
    .fetch_one(pool)
    .await?;

    tracing::info!(shop_id = %shop_id, product_id = %product.id, "Product created");
    Ok(product)
}

pub async fn update(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
    input: &UpdateProduct,
) -> Result<Product, AppError> {
    find_by_id(pool, shop_id, id).await?;
    check_price(input.price)?;
    check_category(pool, shop_id, input.category_id).await?;

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            price = COALESCE($5, price),
            category_id = COALESCE($6, category_id),
            image_url = COALESCE($7, image_url),
            is_available = COALESCE($8, is_available),
            updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .bind(input.name.as_deref().map(str::trim))
    .bind(&input.description)
    .bind(input.price)
    .bind(input.category_id)
    .bind(&input.image_url)
    .bind(input.is_available)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn delete(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(())
}
