//! Image upload route for menu, shop and avatar pictures.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::services::storage::{self, StoredBlob};
use crate::AppState;

/// POST /api/v1/uploads (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<StoredBlob>>), AppError> {
    let mut file: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
        file = Some((bytes.to_vec(), content_type));
    }

    let (bytes, content_type) = file.ok_or_else(|| {
        AppError::Validation("Missing 'file' field in multipart request".to_string())
    })?;

    let blob = storage::store_blob(
        &state.config.upload_dir,
        &state.config.public_base_url,
        &bytes,
        &content_type,
        state.config.max_upload_bytes,
    )
    .await?;

    tracing::info!(user_id = %current_user.id, file = %blob.file_name, "Image uploaded");
    Ok((StatusCode::CREATED, ApiResponse::success(blob)))
}
