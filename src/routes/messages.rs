//! Messaging routes: public customer endpoints and the staff inbox.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::rbac::{Messages, RequireScreen};
use crate::models::message::{
    ConversationSummary, CustomerMessage, Message, OpenConversation, OpenedConversation,
    VendorReply,
};
use crate::routes::stream::snapshot_stream;
use crate::services::message as message_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CustomerAccess {
    pub access_token: Uuid,
}

/// POST /api/v1/public/shops/{shop_id}/conversations
pub async fn open(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Json(body): Json<OpenConversation>,
) -> Result<(StatusCode, Json<ApiResponse<OpenedConversation>>), AppError> {
    body.validate()?;
    let opened = message_service::open(&state.db, shop_id, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(opened)))
}

/// GET /api/v1/public/conversations/{id}?access_token=
pub async fn customer_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(access): Query<CustomerAccess>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    message_service::find_for_customer(&state.db, id, access.access_token).await?;
    let messages = message_service::thread_messages(&state.db, id).await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/v1/public/conversations/{id}/messages
pub async fn customer_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CustomerMessage>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    body.validate()?;
    let message = message_service::post_as_customer(&state.db, &state.realtime, id, &body).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(message)))
}

/// GET /api/v1/conversations
pub async fn list(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Messages>,
) -> Result<Json<ApiResponse<Vec<ConversationSummary>>>, AppError> {
    let conversations = message_service::list_conversations(&state.db, user.shop()?).await?;
    Ok(ApiResponse::success(conversations))
}

/// GET /api/v1/conversations/{id}/messages
pub async fn thread(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Messages>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let messages = message_service::read_thread(&state.db, user.shop()?, id).await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/v1/conversations/{id}/messages
pub async fn reply(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Messages>,
    Path(id): Path<Uuid>,
    Json(body): Json<VendorReply>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    body.validate()?;
    let message =
        message_service::reply(&state.db, &state.realtime, user.shop()?, id, user.id, &body)
            .await?;
    Ok((StatusCode::CREATED, ApiResponse::success(message)))
}

/// GET /api/v1/conversations/{id}/stream
pub async fn stream(
    State(state): State<AppState>,
    RequireScreen(user, _): RequireScreen<Messages>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, AppError> {
    message_service::find_for_shop(&state.db, user.shop()?, id).await?;
    let subscription = state.realtime.messages.subscribe(id);
    let initial = message_service::thread_messages(&state.db, id).await?;
    Ok(snapshot_stream(initial, subscription))
}
