use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, GrayImage, Luma};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::build_router;
use crate::imaging::codec::encode_png;
use crate::models::config::AppConfig;
use crate::AppState;

const BOUNDARY: &str = "photolab-test-boundary";

async fn app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage_dir: dir.path().to_string_lossy().into_owned(),
        ..AppConfig::default()
    };
    let state = AppState::new(config).await.unwrap();
    (build_router(Arc::new(state)), dir)
}

fn png(value: u8) -> Vec<u8> {
    let img = GrayImage::from_fn(32, 32, |x, y| Luma([value.wrapping_add((x * 3 + y) as u8)]));
    encode_png(&DynamicImage::ImageLuma8(img)).unwrap()
}

fn multipart(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/v1/files/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn upload(app: &Router, value: u8) -> String {
    let (status, body) = send(app, multipart("scan.png", "image/png", &png(value))).await;
    assert_eq!(status, StatusCode::OK);
    body["fileId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _dir) = app().await;
    let response = app
        .clone()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn upload_reports_dimensions() {
    let (app, _dir) = app().await;
    let (status, body) = send(&app, multipart("scan.png", "image/png", &png(10))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["width"], 32);
    assert_eq!(body["height"], 32);
}

#[tokio::test]
async fn upload_rejects_text() {
    let (app, _dir) = app().await;
    let (status, body) = send(&app, multipart("notes.txt", "text/plain", b"hello")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "INVALID_MIME_TYPE");
}

#[tokio::test]
async fn filter_output_is_downloadable_and_logged() {
    let (app, _dir) = app().await;
    let file_id = upload(&app, 40).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/filters/apply",
            json!({"fileId": file_id, "type": "sobel", "params": {"direction": "x"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "sobel");
    assert_eq!(body["width"], 32);
    let url = body["url"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(Request::get(url.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let (_, logs) = send(&app, Request::get("/api/v1/logs").body(Body::empty()).unwrap()).await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["operation"], "sobel");
    assert_eq!(logs[0]["processed"], true);
    assert_eq!(logs[1]["operation"], "upload");
}

#[tokio::test]
async fn noise_removal_uses_category_default() {
    let (app, _dir) = app().await;
    let file_id = upload(&app, 0).await;
    let (status, body) = send(&app, post_json("/api/v1/noise/remove", json!({"fileId": file_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "notch_reject");
}

#[tokio::test]
async fn unknown_operation_is_problem_404() {
    let (app, _dir) = app().await;
    let file_id = upload(&app, 0).await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/filters/apply",
            json!({"fileId": file_id, "type": "emboss"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["content-type"], "application/problem+json");
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "UNKNOWN_OPERATION");
    assert_eq!(body["requestId"], request_id);
}

#[tokio::test]
async fn bad_params_are_400() {
    let (app, _dir) = app().await;
    let file_id = upload(&app, 0).await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/adjust/apply",
            json!({"fileId": file_id, "params": {"contrast": 300}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn missing_file_is_404() {
    let (app, _dir) = app().await;
    let (status, body) = send(
        &app,
        post_json("/api/v1/histogram/equalize", json!({"fileId": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn spectrum_split_run_and_stale_source() {
    let (app, _dir) = app().await;
    let a = upload(&app, 20).await;
    let b = upload(&app, 90).await;

    let (status, fwd) = send(&app, post_json("/api/v1/fft/forward", json!({"fileId": a}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fwd["rows"], 32);
    let spectrum_id = fwd["spectrumId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/fft/inverse",
            json!({"spectrumId": spectrum_id, "fileId": a, "noise": {"type": "band", "cutoffFreq": 6, "width": 2}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "fft_inverse");

    let (status, body) = send(
        &app,
        post_json("/api/v1/fft/inverse", json!({"spectrumId": spectrum_id, "fileId": b})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STALE_SPECTRUM");
}

#[tokio::test]
async fn operations_and_histogram_are_listed() {
    let (app, _dir) = app().await;
    let (status, ops) = send(&app, Request::get("/api/v1/operations").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ops.as_array().unwrap().len(), 10);

    let file_id = upload(&app, 5).await;
    let (status, hist) = send(
        &app,
        Request::get(format!("/api/v1/histogram/{}", file_id)).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let total: u64 = hist["lum"].as_array().unwrap().iter().filter_map(Value::as_u64).sum();
    assert_eq!(total, 32 * 32);
}

#[tokio::test]
async fn mask_preview_returns_png() {
    let (app, _dir) = app().await;
    let file_id = upload(&app, 5).await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/mask/preview",
            json!({"fileId": file_id, "noise": {"type": "points", "points": [[0.5, 0.5]]}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
}
