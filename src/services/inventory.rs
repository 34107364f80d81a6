//! Inventory service: stock items, adjustments and low-stock alerts.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::inventory::{
    AdjustStock, CreateInventoryItem, InventoryItem, InventoryItemView, StockLevel,
    UpdateInventoryItem,
};
use crate::models::notification::NotificationKind;
use crate::services::notification;

/// True when an adjustment moves an item into a restock band from a better one.
pub fn crosses_into_restock(before: StockLevel, after: StockLevel) -> bool {
    after.needs_restock() && (after as u8) < (before as u8)
}

/// Quantity after applying `delta`, refusing overflow and negative stock.
pub fn apply_delta(quantity: Decimal, delta: Decimal, unit: &str) -> Result<Decimal, AppError> {
    let next = quantity
        .checked_add(delta)
        .ok_or_else(|| AppError::Validation("delta: out of range".to_string()))?;
    if next < Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "Cannot remove {} {unit}: only {quantity} in stock",
            -delta
        )));
    }
    Ok(next)
}

fn check_non_negative(field: &str, value: Option<Decimal>) -> Result<(), AppError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(AppError::Validation(format!(
            "{field}: must not be negative"
        ))),
        _ => Ok(()),
    }
}

fn name_conflict(e: sqlx::Error, name: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Inventory item '{name}' already exists"))
        }
        _ => AppError::Database(e),
    }
}

/// All items of a shop, lowest stock band first.
pub async fn list(pool: &PgPool, shop_id: Uuid) -> Result<Vec<InventoryItemView>, AppError> {
    let items = sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory_items WHERE shop_id = $1 ORDER BY name ASC",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    let mut views: Vec<InventoryItemView> = items.into_iter().map(Into::into).collect();
    views.sort_by_key(|v| v.stock_level as u8);
    Ok(views)
}

pub async fn find_by_id(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
) -> Result<InventoryItem, AppError> {
    sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory_items WHERE id = $1 AND shop_id = $2",
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory item not found".to_string()))
}

pub async fn create(
    pool: &PgPool,
    shop_id: Uuid,
    input: &CreateInventoryItem,
) -> Result<InventoryItemView, AppError> {
    check_non_negative("quantity", Some(input.quantity))?;
    check_non_negative("min_threshold", input.min_threshold)?;
    let name = input.name.trim();

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        INSERT INTO inventory_items (shop_id, name, unit, quantity, min_threshold)
        VALUES ($1, $2, $3, $4, COALESCE($5, 0))
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(name)
    .bind(input.unit.trim())
    .bind(input.quantity)
    .bind(input.min_threshold)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e, name))?;

    Ok(item.into())
}

pub async fn update(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
    input: &UpdateInventoryItem,
) -> Result<InventoryItemView, AppError> {
    find_by_id(pool, shop_id, id).await?;
    check_non_negative("min_threshold", input.min_threshold)?;
    let name = input.name.as_deref().map(str::trim);

    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        UPDATE inventory_items SET
            name = COALESCE($3, name),
            unit = COALESCE($4, unit),
            min_threshold = COALESCE($5, min_threshold),
            updated_at = NOW()
        WHERE id = $1 AND shop_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .bind(name)
    .bind(input.unit.as_deref().map(str::trim))
    .bind(input.min_threshold)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e, name.unwrap_or_default()))?;

    Ok(item.into())
}

/// Apply a signed quantity change. Stock never goes below zero.
pub async fn adjust(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
    input: &AdjustStock,
) -> Result<InventoryItemView, AppError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory_items WHERE id = $1 AND shop_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory item not found".to_string()))?;

    let quantity = apply_delta(current.quantity, input.delta, &current.unit)?;

    let item = sqlx::query_as::<_, InventoryItem>(
        "UPDATE inventory_items SET quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;

    let before = StockLevel::classify(current.quantity, current.min_threshold);
    let after = StockLevel::classify(item.quantity, item.min_threshold);
    if crosses_into_restock(before, after) {
        let title = if after == StockLevel::Out {
            format!("{} is out of stock", item.name)
        } else {
            format!("{} is running low", item.name)
        };
        let body = format!("{} {} left", item.quantity, item.unit);
        notification::create(&mut *tx, shop_id, NotificationKind::LowStock, &title, &body).await?;
        tracing::info!(shop_id = %shop_id, item_id = %id, level = ?after, "Low stock alert raised");
    }

    tx.commit().await?;
    Ok(item.into())
}

pub async fn delete(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Inventory item not found".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_entering_a_restock_band_alerts() {
        assert!(crosses_into_restock(StockLevel::Healthy, StockLevel::Low));
        assert!(crosses_into_restock(StockLevel::Medium, StockLevel::Out));
        assert!(crosses_into_restock(StockLevel::Low, StockLevel::Out));
        assert!(!crosses_into_restock(StockLevel::Low, StockLevel::Low));
        assert!(!crosses_into_restock(StockLevel::Out, StockLevel::Healthy));
        assert!(!crosses_into_restock(StockLevel::Healthy, StockLevel::Medium));
        assert!(!crosses_into_restock(StockLevel::Out, StockLevel::Low));
    }

    #[test]
    fn adjustments_stay_in_range() {
        let five = Decimal::from(5);
        assert_eq!(apply_delta(five, Decimal::from(-5), "kg").unwrap(), Decimal::ZERO);
        assert_eq!(apply_delta(five, Decimal::new(25, 1), "kg").unwrap(), Decimal::new(75, 1));

        let err = apply_delta(five, Decimal::from(-6), "kg").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Cannot remove 6 kg: only 5 in stock"
        );
        assert!(matches!(
            apply_delta(five, Decimal::MAX, "kg"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(check_non_negative("quantity", Some(Decimal::new(-5, 1))).is_err());
        assert!(check_non_negative("quantity", Some(Decimal::ZERO)).is_ok());
        assert!(check_non_negative("min_threshold", None).is_ok());
    }
}
