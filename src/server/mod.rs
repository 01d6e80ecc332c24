//! HTTP surface
//!
//! `build_router` wires the handlers to a shared [`AppState`]. Handlers only
//! decode uploads and hand them to the orchestrator; status codes come from
//! [`ApiError`].

pub mod error;
pub mod handlers;
pub mod state;
pub mod upload;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::{Config, BYTES_PER_MB};

pub use error::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and part headers on top of the payload
const MULTIPART_OVERHEAD: u64 = BYTES_PER_MB;

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state
        .config
        .admission_limits()
        .max_total_size
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/analyze-multiple", post(handlers::analyze_multiple))
        .route("/analyze-consolidated", post(handlers::analyze_consolidated))
        .route("/classify-documents", post(handlers::classify_documents))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentials rule out wildcard methods and headers
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}
