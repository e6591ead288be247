use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::handlers;
use crate::AppState;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Tags every response with an `X-Request-Id`, keeping one already set by
/// an error response.
async fn request_id_middleware(request: Request<Body>, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    if !response.headers().contains_key(&REQUEST_ID) {
        let request_id = uuid::Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID, value);
        }
    }
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, REQUEST_ID])
        .expose_headers([REQUEST_ID]);

    let api_v1 = Router::new()
        .route("/files/upload", post(handlers::files::upload_file))
        .route(
            "/files/:file_id",
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route("/operations", get(handlers::operations::list_operations))
        .route("/filters/apply", post(handlers::operations::apply_filter))
        .route("/noise/add", post(handlers::operations::add_noise))
        .route("/noise/remove", post(handlers::operations::remove_noise))
        .route("/histogram/equalize", post(handlers::operations::equalize_histogram))
        .route("/histogram/:file_id", get(handlers::operations::get_histogram))
        .route("/adjust/apply", post(handlers::operations::apply_adjustments))
        .route("/fft/forward", post(handlers::fft::forward))
        .route("/fft/inverse", post(handlers::fft::inverse))
        .route("/mask/preview", post(handlers::fft::mask_preview))
        .route("/logs", get(handlers::logs::list_logs));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
            )
        })
        .on_response(|response: &Response, latency: std::time::Duration, _span: &Span| {
            tracing::info!(
                status = response.status().as_u16(),
                latency_ms = latency.as_millis() as u64,
                "response",
            );
        });

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/api/health", get(handlers::health::health_check))
        .route("/api/version", get(handlers::health::version))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_upload_bytes as usize,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests;
