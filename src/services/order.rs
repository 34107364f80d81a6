//! Order service: cart pricing, status lifecycle and live active-order feed.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::NotificationKind;
use crate::models::order::{CartLine, CreateOrder, Order, OrderFilters, OrderItem, OrderStatus};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::product::Product;
use crate::services::realtime::Realtime;
use crate::services::{notification, product};

/// Allowed status changes. Completed and cancelled orders are final.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Preparing)
            | (Preparing, Ready)
            | (Ready, Completed)
            | (Pending, Cancelled)
            | (Preparing, Cancelled)
            | (Ready, Cancelled)
    )
}

/// Turn cart lines into priced line items using the catalog.
///
/// Every line must reference an available product of the shop.
pub fn price_cart(
    lines: &[CartLine],
    products: &[Product],
) -> Result<(Vec<OrderItem>, Decimal), AppError> {
    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let product = by_id
            .get(&line.product_id)
            .filter(|p| p.is_available)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "items: product {} is not available",
                    line.product_id
                ))
            })?;
        items.push(OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    let total = items.iter().map(OrderItem::line_total).sum();
    Ok((items, total))
}

/// Orders still in the kitchen, oldest first.
pub async fn active_orders(pool: &PgPool, shop_id: Uuid) -> Result<Vec<Order>, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE shop_id = $1 \
         AND status IN ('pending', 'preparing', 'ready') ORDER BY created_at ASC",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

/// Push the shop's active orders to live subscribers.
///
/// The mutation that triggered it has already committed, so failures are
/// only logged.
pub async fn publish_active(pool: &PgPool, realtime: &Realtime, shop_id: Uuid) {
    if realtime.orders.subscriber_count(shop_id) == 0 {
        return;
    }
    match active_orders(pool, shop_id).await {
        Ok(orders) => realtime.orders.publish(shop_id, orders),
        Err(e) => tracing::warn!(shop_id = %shop_id, error = %e, "Active order snapshot failed"),
    }
}

pub async fn create(
    pool: &PgPool,
    realtime: &Realtime,
    shop_id: Uuid,
    created_by: Uuid,
    input: &CreateOrder,
) -> Result<Order, AppError> {
    let ids: Vec<Uuid> = input.items.iter().map(|l| l.product_id).collect();
    let catalog = product::find_available(pool, shop_id, &ids).await?;
    let (items, total) = price_cart(&input.items, &catalog)?;

    let mut tx = pool.begin().await?;
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (shop_id, items, total, status, payment_method, customer_name, notes, created_by)
        VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(Json(&items))
    .bind(total)
    .bind(input.payment_method)
    .bind(&input.customer_name)
    .bind(&input.notes)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    let item_count: i32 = items.iter().map(|i| i.quantity).sum();
    notification::create(
        &mut *tx,
        shop_id,
        NotificationKind::NewOrder,
        "New order",
        &format!("{item_count} item(s), total {total}"),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(shop_id = %shop_id, order_id = %order.id, total = %total, "Order created");
    publish_active(pool, realtime, shop_id).await;
    Ok(order)
}

pub async fn find_by_id(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND shop_id = $2")
        .bind(id)
        .bind(shop_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Newest-first page of a shop's orders.
pub async fn list(
    pool: &PgPool,
    shop_id: Uuid,
    filters: &OrderFilters,
    pagination: &Pagination,
) -> Result<PagedResult<Order>, AppError> {
    let mut conditions = vec!["shop_id = $1".to_string()];
    let mut param_index = 1u32;

    if filters.status.is_some() {
        param_index += 1;
        conditions.push(format!("status = ${param_index}"));
    }
    if filters.from.is_some() {
        param_index += 1;
        conditions.push(format!("created_at >= ${param_index}"));
    }
    if filters.to.is_some() {
        param_index += 1;
        conditions.push(format!("created_at < ${param_index}"));
    }

    let where_clause = conditions.join(" AND ");
    let count_sql = format!("SELECT COUNT(*) FROM orders WHERE {where_clause}");
    let data_sql = format!(
        "SELECT * FROM orders WHERE {where_clause} ORDER BY created_at DESC LIMIT {} OFFSET {}",
        pagination.limit(),
        pagination.offset()
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(shop_id);
    let mut data_query = sqlx::query_as::<_, Order>(&data_sql).bind(shop_id);

    macro_rules! bind_both {
        ($val:expr) => {
            count_query = count_query.bind($val);
            data_query = data_query.bind($val);
        };
    }

    if let Some(status) = filters.status {
        bind_both!(status);
    }
    if let Some(from) = filters.from {
        bind_both!(from);
    }
    if let Some(to) = filters.to {
        bind_both!(to);
    }

    let total = count_query.fetch_one(pool).await?;
    let items = data_query.fetch_all(pool).await?;
    Ok(PagedResult::new(items, total, pagination))
}

/// Move an order to `to` if the lifecycle allows it.
pub async fn transition(
    pool: &PgPool,
    realtime: &Realtime,
    shop_id: Uuid,
    id: Uuid,
    to: OrderStatus,
) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND shop_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if !is_valid_transition(current.status, to) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot move order from {} to {}",
            current.status.as_str(),
            to.as_str()
        )));
    }

    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET
            status = $2,
            completed_at = CASE WHEN $2 = 'completed'::order_status THEN NOW() ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(to)
    .fetch_one(&mut *tx)
    .await?;

    if matches!(to, OrderStatus::Ready | OrderStatus::Cancelled) {
        let short_id = &order.id.to_string()[..8];
        notification::create(
            &mut *tx,
            shop_id,
            NotificationKind::OrderStatus,
            &format!("Order {short_id} is {}", to.as_str()),
            &format!("Total {}", order.total),
        )
        .await?;
    }
    tx.commit().await?;

    tracing::info!(
        order_id = %id,
        from = current.status.as_str(),
        to = to.as_str(),
        "Order status changed"
    );
    publish_active(pool, realtime, shop_id).await;
    Ok(order)
}
