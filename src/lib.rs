//! # Document Triage
//!
//! An HTTP service that extracts text from uploaded documents, classifies
//! them into routing channels and asks a language model for structured
//! analysis, per file or consolidated across a batch.
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `infrastructure/` - per-request resources, nothing domain-specific
//! - `Deadline` - one countdown shared by every file in a request
//! - `ScopedTempFile` - on-disk copy of an upload, removed on drop
//!
//! ### ② Services
//! - `services/` - what can be done with one document
//! - `AdmissionGuard` - count, type and size limits
//! - `TextExtractor` - text out of PDF, Office, RTF and plain files, with tesseract OCR for images and scans
//! - `DocumentIntelligence` - classify / analyze / consolidated analysis
//! - `Consolidator` - sampling plus the single cross-document call
//!
//! ### ③ Workflow
//! - `workflow/` - the full path of a single file
//! - `FileCtx` - `[file i/n]` log context
//! - `FilePipeline` - check → temp copy → extract → classify or analyze
//!
//! ### ④ Orchestration
//! - `orchestrator/` - the four batch strategies and their reports
//! - `server/` - axum router, multipart decoding, error → status mapping

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod services;
pub mod utils;
pub mod workflow;

pub use app::App;
pub use config::Config;
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use infrastructure::Deadline;
pub use models::{Category, Classification, FileOutcome, FileTask};
pub use orchestrator::BatchOrchestrator;
pub use server::{build_router, AppState};
pub use workflow::{FileCtx, FilePipeline};
