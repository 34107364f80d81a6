//! Shop notifications: raised by orders, stock and messages; read by staff.

use chrono::Utc;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::{Notification, NotificationKind, NotificationView, UnreadCount};
use crate::models::pagination::{PagedResult, Pagination};
use crate::services::dashboard::time_ago;

/// Record a notification for every staff member of `shop_id`.
pub async fn create<'e, E>(
    executor: E,
    shop_id: Uuid,
    kind: NotificationKind,
    title: &str,
    body: &str,
) -> Result<Notification, AppError>
where
    E: PgExecutor<'e>,
{
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (shop_id, kind, title, body)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .fetch_one(executor)
    .await?;

    tracing::debug!(
        shop_id = %shop_id,
        notification_id = %notification.id,
        kind = ?kind,
        "Notification created"
    );
    Ok(notification)
}

/// Newest-first page of a shop's notifications with display timestamps.
pub async fn list(
    pool: &PgPool,
    shop_id: Uuid,
    unread_only: bool,
    pagination: &Pagination,
) -> Result<PagedResult<NotificationView>, AppError> {
    let filter = if unread_only { "AND is_read = false" } else { "" };

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM notifications WHERE shop_id = $1 {filter}"
    ))
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, Notification>(&format!(
        "SELECT * FROM notifications WHERE shop_id = $1 {filter} \
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(shop_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    let items = rows
        .into_iter()
        .map(|notification| NotificationView {
            time_ago: time_ago(notification.created_at, now),
            notification,
        })
        .collect();

    Ok(PagedResult::new(items, total, pagination))
}

pub async fn unread_count(pool: &PgPool, shop_id: Uuid) -> Result<UnreadCount, AppError> {
    let unread = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE shop_id = $1 AND is_read = false",
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await?;
    Ok(UnreadCount { unread })
}

/// Mark a single notification read. Idempotent.
pub async fn mark_read(pool: &PgPool, shop_id: Uuid, id: Uuid) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = true WHERE id = $1 AND shop_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}

/// Mark every unread notification of the shop read; returns how many changed.
pub async fn mark_all_read(pool: &PgPool, shop_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = true WHERE shop_id = $1 AND is_read = false",
    )
    .bind(shop_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
