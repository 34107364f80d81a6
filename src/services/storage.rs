//! Content-addressed blob storage for menu, shop and avatar images.

use std::path::Path;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::AppError;

/// Public path prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Stored blob and where clients can fetch it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredBlob {
    pub file_name: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// File extension for the image types we accept.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Hex SHA-256 of the blob contents.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Write `bytes` under `dir` named by its hash and return the public URL.
///
/// Identical content maps to the same file, so re-uploads are no-ops.
pub async fn store_blob(
    dir: &Path,
    public_base_url: &str,
    bytes: &[u8],
    content_type: &str,
    max_bytes: usize,
) -> Result<StoredBlob, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "File exceeds the {max_bytes} byte limit"
        )));
    }
    let extension = extension_for(content_type).ok_or_else(|| {
        AppError::Validation(format!("Unsupported content type: {content_type}"))
    })?;

    let file_name = format!("{}.{extension}", content_hash(bytes));
    let path = dir.join(&file_name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot create upload dir: {e}")))?;

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tracing::debug!(file = %file_name, "Blob already stored");
    } else {
        write_atomically(dir, &file_name, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write upload: {e}")))?;
        tracing::info!(file = %file_name, size = bytes.len(), "Blob stored");
    }

    Ok(StoredBlob {
        url: format!(
            "{}{PUBLIC_PREFIX}/{file_name}",
            public_base_url.trim_end_matches('/')
        ),
        file_name,
        size: bytes.len(),
        content_type: content_type.to_string(),
    })
}

/// Write `bytes` under a private temporary name, then rename into place so
/// readers never observe a partial blob.
async fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<()> {
    let temp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&temp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp, dir.join(file_name)).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}
