//! HTTP error mapping

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::AdmissionLimits;
use crate::error::{ErrorKind, PipelineError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Request body too large")]
    PayloadTooLarge { limits: AdmissionLimits },

    #[error("Invalid multipart upload: {0}")]
    InvalidUpload(String),
}

impl ApiError {
    /// Body-limit hits become 413, every other decode failure 400
    pub fn from_multipart(err: MultipartError, limits: AdmissionLimits) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limits }
        } else {
            ApiError::InvalidUpload(err.body_text())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::InvalidUpload(rejection.body_text())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NoFilesProvided | ErrorKind::TooManyFiles | ErrorKind::UnsupportedFileType => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::FileTooLarge | ErrorKind::TotalSizeExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::DeadlineExceeded | ErrorKind::AnalysisTimeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::NoProcessableFiles
        | ErrorKind::ExtractionFailed
        | ErrorKind::NoTextExtracted => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::AnalysisFailed | ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn title_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::PAYLOAD_TOO_LARGE => "File too large",
        StatusCode::REQUEST_TIMEOUT => "Request Timeout",
        StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable Entity",
        _ => "Internal server error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Pipeline(PipelineError::Internal(e)) => {
                let error_id = uuid::Uuid::new_v4().to_string();
                error!("[{}] Internal error: {:#}", error_id, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Internal server error",
                        "detail": "An unexpected error occurred",
                        "error_id": error_id,
                    }),
                )
            }
            ApiError::Pipeline(err) => {
                let status = status_for(err.kind());
                let mut body = json!({
                    "error": title_for(status),
                    "detail": err.to_string(),
                });
                match &err {
                    PipelineError::FileTooLarge { max_mb, .. } => {
                        body["max_file_size_mb"] = json!(max_mb);
                    }
                    PipelineError::TotalSizeExceeded { max_mb, .. } => {
                        body["max_total_size_mb"] = json!(max_mb);
                    }
                    _ => {}
                }
                if status.is_server_error() {
                    error!("Request failed: {}", err);
                } else {
                    warn!("Request rejected ({}): {}", status.as_u16(), err);
                }
                (status, body)
            }
            ApiError::PayloadTooLarge { limits } => {
                warn!("Request body exceeded the upload limit");
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    json!({
                        "error": "File too large",
                        "detail": "The uploaded files exceed the configured size limits",
                        "max_file_size_mb": limits.max_file_size_mb(),
                        "max_total_size_mb": limits.max_total_size_mb(),
                    }),
                )
            }
            ApiError::InvalidUpload(detail) => {
                warn!("Invalid multipart upload: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "Bad Request",
                        "detail": format!("Invalid multipart upload: {}", detail),
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
