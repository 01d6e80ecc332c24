//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{StatusCode, Uri},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::PipelineError;
use crate::orchestrator::{
    ClassificationReport, ConsolidatedReport, IndividualReport, SingleFileReport,
};
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::server::upload;

pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/",
    "/health",
    "/analyze",
    "/analyze-multiple",
    "/analyze-consolidated",
    "/classify-documents",
];

/// Seconds since the epoch, with millisecond precision
fn timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Document Analysis API",
        "timestamp": timestamp(),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": timestamp(),
    }))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SingleFileReport>, ApiError> {
    let mut multipart = multipart?;
    let limits = state.config.admission_limits();
    let task = upload::read_first_file(&mut multipart, limits)
        .await?
        .ok_or(PipelineError::NoFilesProvided)?;

    info!("POST /analyze: '{}'", task.filename());
    let report = state.orchestrator.analyze_single(task).await?;
    Ok(Json(report))
}

pub async fn analyze_multiple(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IndividualReport>, ApiError> {
    let mut multipart = multipart?;
    let tasks = upload::read_files(&mut multipart, state.config.admission_limits()).await?;

    info!("POST /analyze-multiple: {} file(s)", tasks.len());
    let report = state.orchestrator.analyze_individually(tasks).await?;
    Ok(Json(report))
}

pub async fn classify_documents(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationReport>, ApiError> {
    let mut multipart = multipart?;
    let tasks = upload::read_files(&mut multipart, state.config.admission_limits()).await?;

    info!("POST /classify-documents: {} file(s)", tasks.len());
    let report = state.orchestrator.classify(tasks).await?;
    Ok(Json(report))
}

pub async fn analyze_consolidated(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConsolidatedReport>, ApiError> {
    let mut multipart = multipart?;
    let tasks = upload::read_files(&mut multipart, state.config.admission_limits()).await?;

    info!("POST /analyze-consolidated: {} file(s)", tasks.len());
    let report = state.orchestrator.analyze_consolidated(tasks).await?;
    Ok(Json(report))
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    let path = uri.path().trim_start_matches('/');
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "detail": format!("The requested path '{}' was not found on this server.", path),
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}
