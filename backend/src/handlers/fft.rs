use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::handlers::operations::OperationResponse;
use crate::models::error::AppError;
use crate::spectral::NoiseSpec;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    pub file_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardResponse {
    pub spectrum_id: String,
    pub magnitude_file_id: String,
    pub magnitude_url: String,
    pub fingerprint: String,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InverseRequest {
    pub spectrum_id: String,
    pub file_id: String,
    pub noise: Option<NoiseSpec>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskPreviewRequest {
    pub file_id: String,
    pub noise: Option<NoiseSpec>,
}

pub async fn forward(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForwardRequest>,
) -> Result<Json<ForwardResponse>, AppError> {
    let out = state
        .processing
        .forward_spectrum(&state.store, &req.file_id)
        .await?;
    Ok(Json(ForwardResponse {
        spectrum_id: out.spectrum.file_id,
        magnitude_url: out.magnitude.url(),
        magnitude_file_id: out.magnitude.file_id,
        fingerprint: out.fingerprint,
        rows: out.rows,
        cols: out.cols,
    }))
}

pub async fn inverse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InverseRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    let source = state.store.get(&req.file_id)?;
    let out = state
        .processing
        .inverse_spectrum(&state.store, &req.spectrum_id, &req.file_id, req.noise)
        .await?;
    state
        .audit
        .record(&source.original_filename, &out.operation, true);
    Ok(Json(out.into()))
}

pub async fn mask_preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MaskPreviewRequest>,
) -> Result<Response, AppError> {
    let png = state
        .processing
        .mask_preview(&state.store, &req.file_id, req.noise)
        .await?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png).into_response())
}
