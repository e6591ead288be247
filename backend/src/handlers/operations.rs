use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::imaging::histogram::HistogramData;
use crate::models::error::AppError;
use crate::services::operations::{OperationCategory, OperationDescriptor};
use crate::services::processing::ProcessedOutput;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub file_id: String,
    #[serde(rename = "type")]
    pub operation: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub file_id: String,
    pub url: String,
    pub operation: String,
    pub width: u32,
    pub height: u32,
    pub checksum: String,
}

impl From<ProcessedOutput> for OperationResponse {
    fn from(out: ProcessedOutput) -> Self {
        Self {
            url: out.stored.url(),
            width: out.stored.width.unwrap_or(0),
            height: out.stored.height.unwrap_or(0),
            checksum: out.stored.hash,
            file_id: out.stored.file_id,
            operation: out.operation,
        }
    }
}

pub async fn list_operations(State(state): State<Arc<AppState>>) -> Json<Vec<OperationDescriptor>> {
    Json(state.processing.registry().list())
}

async fn run(
    state: &AppState,
    category: OperationCategory,
    req: OperationRequest,
) -> Result<Json<OperationResponse>, AppError> {
    let source = state.store.get(&req.file_id)?;
    let out = state
        .processing
        .apply(
            &state.store,
            &req.file_id,
            category,
            req.operation.as_deref(),
            req.params,
        )
        .await?;
    state
        .audit
        .record(&source.original_filename, &out.operation, true);
    Ok(Json(out.into()))
}

pub async fn apply_filter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    run(&state, OperationCategory::Filter, req).await
}

pub async fn add_noise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    run(&state, OperationCategory::NoiseAdd, req).await
}

pub async fn remove_noise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    run(&state, OperationCategory::NoiseRemove, req).await
}

pub async fn equalize_histogram(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    run(&state, OperationCategory::Histogram, req).await
}

pub async fn apply_adjustments(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, AppError> {
    run(&state, OperationCategory::Adjust, req).await
}

pub async fn get_histogram(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<HistogramData>, AppError> {
    let histogram = state.processing.histogram(&state.store, &file_id).await?;
    Ok(Json(histogram))
}
