use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::error::AppError;
use crate::AppState;

/// Formats the decoder understands. Octet-stream uploads are accepted and
/// sniffed from their header.
const ALLOWED_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/bmp",
    "image/tiff",
    "image/gif",
    "image/webp",
    "application/octet-stream",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    pub expires_at: String,
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?
    {
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        if !ALLOWED_TYPES.iter().any(|t| content_type.starts_with(t)) {
            return Err(AppError::InvalidMimeType(content_type));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read upload: {}", e)))?;

        let stored = state
            .store
            .store_upload(&filename, &data, &content_type)
            .await?;
        state.audit.record(&filename, "upload", false);

        return Ok(Json(UploadResponse {
            file_id: stored.file_id,
            width: stored.width.unwrap_or(0),
            height: stored.height.unwrap_or(0),
            size_bytes: stored.size_bytes,
            expires_at: stored.expires_at.to_rfc3339(),
        }));
    }

    Err(AppError::ValidationError("No file in upload".to_string()))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response, AppError> {
    let stored = state.store.get(&file_id)?;
    let data = state.store.read_bytes(&file_id).await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        stored.original_filename.replace('"', "")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, stored.mime_type),
            (header::CONTENT_LENGTH, data.len().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(&file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
