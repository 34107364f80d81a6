//! Customer messaging: public conversation threads answered by shop staff.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::message::{
    Conversation, ConversationSummary, CustomerMessage, Message, OpenConversation,
    OpenedConversation, SenderKind, VendorReply,
};
use crate::models::notification::NotificationKind;
use crate::services::realtime::Realtime;
use crate::services::{notification, shop};

const PREVIEW_CHARS: usize = 80;

fn preview(body: &str) -> String {
    let mut text: String = body.chars().take(PREVIEW_CHARS).collect();
    if body.chars().count() > PREVIEW_CHARS {
        text.push_str("...");
    }
    text
}

async fn insert_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    sender_kind: SenderKind,
    sender_id: Option<Uuid>,
    sender_name: &str,
    body: &str,
) -> Result<Message, AppError> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (conversation_id, sender_kind, sender_id, sender_name, body)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(conversation_id)
    .bind(sender_kind)
    .bind(sender_id)
    .bind(sender_name)
    .bind(body.trim())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
        .bind(conversation_id)
        .bind(message.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(message)
}

/// Whole thread, oldest first.
pub async fn thread_messages(pool: &PgPool, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;
    Ok(messages)
}

/// Push the thread to live subscribers. Failures are logged only.
pub async fn publish_thread(pool: &PgPool, realtime: &Realtime, conversation_id: Uuid) {
    if realtime.messages.subscriber_count(conversation_id) == 0 {
        return;
    }
    match thread_messages(pool, conversation_id).await {
        Ok(messages) => realtime.messages.publish(conversation_id, messages),
        Err(e) => tracing::warn!(
            conversation_id = %conversation_id,
            error = %e,
            "Thread snapshot failed"
        ),
    }
}

async fn find_conversation(pool: &PgPool, id: Uuid) -> Result<Conversation, AppError> {
    sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))
}

/// Conversation of `shop_id`, for staff access.
pub async fn find_for_shop(
    pool: &PgPool,
    shop_id: Uuid,
    id: Uuid,
) -> Result<Conversation, AppError> {
    let conversation = find_conversation(pool, id).await?;
    if conversation.shop_id != shop_id {
        return Err(AppError::NotFound("Conversation not found".to_string()));
    }
    Ok(conversation)
}

/// Conversation addressed by a customer's access token.
pub async fn find_for_customer(
    pool: &PgPool,
    id: Uuid,
    access_token: Uuid,
) -> Result<Conversation, AppError> {
    let conversation = find_conversation(pool, id).await?;
    if conversation.access_token != access_token {
        return Err(AppError::Forbidden("Invalid conversation token".to_string()));
    }
    Ok(conversation)
}

/// Start a conversation with a shop. The access token is only returned here.
pub async fn open(
    pool: &PgPool,
    shop_id: Uuid,
    input: &OpenConversation,
) -> Result<OpenedConversation, AppError> {
    shop::find_by_id(pool, shop_id).await?;
    let access_token = Uuid::new_v4();
    let customer_name = input.customer_name.trim();

    let mut tx = pool.begin().await?;
    let conversation = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (shop_id, customer_name, customer_email, access_token)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(customer_name)
    .bind(&input.customer_email)
    .bind(access_token)
    .fetch_one(&mut *tx)
    .await?;

    let message = insert_message(
        &mut tx,
        conversation.id,
        SenderKind::Customer,
        None,
        customer_name,
        &input.body,
    )
    .await?;
    notification::create(
        &mut *tx,
        shop_id,
        NotificationKind::Message,
        &format!("New conversation from {customer_name}"),
        &preview(&message.body),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(shop_id = %shop_id, conversation_id = %conversation.id, "Conversation opened");
    Ok(OpenedConversation {
        conversation_id: conversation.id,
        access_token,
        message,
    })
}

/// Post as the customer holding the conversation's token.
pub async fn post_as_customer(
    pool: &PgPool,
    realtime: &Realtime,
    conversation_id: Uuid,
    input: &CustomerMessage,
) -> Result<Message, AppError> {
    let conversation = find_for_customer(pool, conversation_id, input.access_token).await?;

    let mut tx = pool.begin().await?;
    let message = insert_message(
        &mut tx,
        conversation.id,
        SenderKind::Customer,
        None,
        &conversation.customer_name,
        &input.body,
    )
    .await?;
    notification::create(
        &mut *tx,
        conversation.shop_id,
        NotificationKind::Message,
        &format!("Message from {}", conversation.customer_name),
        &preview(&message.body),
    )
    .await?;
    tx.commit().await?;

    publish_thread(pool, realtime, conversation.id).await;
    Ok(message)
}

/// Conversations of a shop, most recently active first.
pub async fn list_conversations(
    pool: &PgPool,
    shop_id: Uuid,
) -> Result<Vec<ConversationSummary>, AppError> {
    let conversations = sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT c.id, c.customer_name, c.customer_email, c.last_message_at,
            (SELECT COUNT(*) FROM messages m
              WHERE m.conversation_id = c.id
                AND m.sender_kind = 'customer' AND m.read_at IS NULL) AS unread_count,
            (SELECT m.body FROM messages m
              WHERE m.conversation_id = c.id
              ORDER BY m.created_at DESC LIMIT 1) AS last_message
        FROM conversations c
        WHERE c.shop_id = $1
        ORDER BY c.last_message_at DESC
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;
    Ok(conversations)
}

/// Staff view of a thread. Unread customer messages become read.
pub async fn read_thread(
    pool: &PgPool,
    shop_id: Uuid,
    conversation_id: Uuid,
) -> Result<Vec<Message>, AppError> {
    find_for_shop(pool, shop_id, conversation_id).await?;

    let marked = sqlx::query(
        "UPDATE messages SET read_at = NOW() \
         WHERE conversation_id = $1 AND sender_kind = 'customer' AND read_at IS NULL",
    )
    .bind(conversation_id)
    .execute(pool)
    .await?;
    tracing::debug!(
        conversation_id = %conversation_id,
        marked = marked.rows_affected(),
        "Thread read"
    );

    thread_messages(pool, conversation_id).await
}

/// Reply on behalf of the shop.
pub async fn reply(
    pool: &PgPool,
    realtime: &Realtime,
    shop_id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    input: &VendorReply,
) -> Result<Message, AppError> {
    let conversation = find_for_shop(pool, shop_id, conversation_id).await?;

    let sender_name = sqlx::query_scalar::<_, String>(
        "SELECT display_name FROM profiles WHERE user_id = $1",
    )
    .bind(sender_id)
    .fetch_optional(pool)
    .await?
    .unwrap_or_else(|| "Staff".to_string());

    let mut tx = pool.begin().await?;
    let message = insert_message(
        &mut tx,
        conversation.id,
        SenderKind::Vendor,
        Some(sender_id),
        &sender_name,
        &input.body,
    )
    .await?;
    tx.commit().await?;

    publish_thread(pool, realtime, conversation.id).await;
    Ok(message)
}
