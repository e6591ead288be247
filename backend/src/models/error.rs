use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::spectral::SpectralError;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub request_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Stale spectrum: {0}")]
    StaleSpectrum(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("File too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("Invalid MIME type: {0}")]
    InvalidMimeType(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SpectralError> for AppError {
    fn from(err: SpectralError) -> Self {
        match err {
            SpectralError::InvalidInput(detail) => AppError::InvalidInput(detail),
            SpectralError::StaleArtifact { .. } => AppError::StaleSpectrum(err.to_string()),
            SpectralError::ShapeMismatch { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnknownOperation(_) => StatusCode::NOT_FOUND,
            AppError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StaleSpectrum(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidMimeType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_problem_detail(&self, request_id: &str) -> ProblemDetail {
        let (code, title, detail) = match self {
            AppError::FileNotFound(id) => (
                "FILE_NOT_FOUND",
                "File Not Found",
                format!("File '{}' is missing, expired, or inaccessible", id),
            ),
            AppError::InvalidImage(detail) => ("INVALID_IMAGE", "Invalid Image", detail.clone()),
            AppError::InvalidInput(detail) => ("INVALID_INPUT", "Invalid Input", detail.clone()),
            AppError::UnknownOperation(name) => (
                "UNKNOWN_OPERATION",
                "Unknown Operation",
                format!("No operation named '{}' in this category", name),
            ),
            AppError::StaleSpectrum(detail) => ("STALE_SPECTRUM", "Stale Spectrum", detail.clone()),
            AppError::ValidationError(field) => {
                ("VALIDATION_ERROR", "Validation Error", field.clone())
            }
            AppError::FileTooLarge(size) => (
                "FILE_TOO_LARGE",
                "File Too Large",
                format!("File size {} exceeds maximum allowed", size),
            ),
            AppError::InvalidMimeType(mime) => (
                "INVALID_MIME_TYPE",
                "Invalid MIME Type",
                format!("MIME type '{}' is not supported", mime),
            ),
            AppError::Internal(detail) => ("INTERNAL_ERROR", "Internal Error", detail.clone()),
        };

        ProblemDetail {
            problem_type: format!("/problems/{}", code.to_lowercase()),
            title: title.to_string(),
            status: self.status().as_u16(),
            detail,
            code: code.to_string(),
            request_id: request_id.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // request_id_middleware keeps this id so header and body agree.
        let request_id = uuid::Uuid::new_v4().to_string();
        if let AppError::Internal(detail) = &self {
            tracing::error!(request_id = %request_id, "{}", detail);
        }
        let problem = self.to_problem_detail(&request_id);

        let mut response = (self.status(), Json(problem)).into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("X-Request-Id", value);
        }
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}
