//! Customer ↔ vendor conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sender_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Customer,
    Vendor,
}

/// Conversation row. `access_token` is only ever returned to the customer who opened it.
#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub access_token: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Conversation as listed for staff, with unread customer messages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
    pub last_message: Option<String>,
}

/// Returned once to the customer when a conversation is opened.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedConversation {
    pub conversation_id: Uuid,
    pub access_token: Uuid,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_kind: SenderKind,
    pub sender_id: Option<Uuid>,
    pub sender_name: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OpenConversation {
    #[validate(length(min = 1, max = 80, message = "must be 1 to 80 characters"))]
    pub customer_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerMessage {
    pub access_token: Uuid,
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VendorReply {
    #[validate(length(min = 1, max = 2000, message = "must be 1 to 2000 characters"))]
    pub body: String,
}
