use serde::Serialize;
use thiserror::Error;

/// Errors raised while admitting and processing a batch of documents
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No files provided")]
    NoFilesProvided,

    #[error("Maximum {max} files allowed per request (received {count})")]
    TooManyFiles { count: usize, max: usize },

    #[error("Unsupported file type for '{filename}': {extension}. Allowed types: {allowed}")]
    UnsupportedFileType {
        filename: String,
        extension: String,
        allowed: String,
    },

    #[error("File '{filename}' too large ({size} bytes). Maximum size allowed: {max_mb}MB")]
    FileTooLarge {
        filename: String,
        size: u64,
        max_mb: u64,
    },

    #[error("Total files size too large ({total} bytes). Maximum total size allowed: {max_mb}MB")]
    TotalSizeExceeded { total: u64, max_mb: u64 },

    #[error("Text extraction failed for '{filename}': {reason}")]
    ExtractionFailed { filename: String, reason: String },

    #[error("No text could be extracted from '{filename}'")]
    NoTextExtracted { filename: String },

    #[error("Analysis timeout for '{filename}'")]
    AnalysisTimeout { filename: String },

    #[error("Analysis failed for '{filename}': {reason}")]
    AnalysisFailed { filename: String, reason: String },

    #[error("Request timeout exceeded")]
    DeadlineExceeded,

    #[error("No files could be processed successfully")]
    NoProcessableFiles,

    /// A per-file failure raised as the error of a single-file request
    #[error("{message}")]
    FileFailed { kind: ErrorKind, message: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Fieldless mirror of [`PipelineError`], carried by per-file failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoFilesProvided,
    TooManyFiles,
    UnsupportedFileType,
    FileTooLarge,
    TotalSizeExceeded,
    ExtractionFailed,
    NoTextExtracted,
    AnalysisTimeout,
    AnalysisFailed,
    DeadlineExceeded,
    NoProcessableFiles,
    InternalError,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NoFilesProvided => ErrorKind::NoFilesProvided,
            PipelineError::TooManyFiles { .. } => ErrorKind::TooManyFiles,
            PipelineError::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            PipelineError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            PipelineError::TotalSizeExceeded { .. } => ErrorKind::TotalSizeExceeded,
            PipelineError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            PipelineError::NoTextExtracted { .. } => ErrorKind::NoTextExtracted,
            PipelineError::AnalysisTimeout { .. } => ErrorKind::AnalysisTimeout,
            PipelineError::AnalysisFailed { .. } => ErrorKind::AnalysisFailed,
            PipelineError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            PipelineError::NoProcessableFiles => ErrorKind::NoProcessableFiles,
            PipelineError::FileFailed { kind, .. } => *kind,
            PipelineError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Admission errors are caller mistakes and abort the whole request
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            PipelineError::NoFilesProvided
                | PipelineError::TooManyFiles { .. }
                | PipelineError::UnsupportedFileType { .. }
                | PipelineError::FileTooLarge { .. }
                | PipelineError::TotalSizeExceeded { .. }
        )
    }
}

/// Text extraction failures
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to process PDF: {0}")]
    Pdf(String),

    #[error("Failed to process {format} archive: {reason}")]
    OfficeArchive { format: &'static str, reason: String },

    #[error("No extraction backend available for {0}")]
    Unsupported(String),

    #[error("OCR backend unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Language-model call failures
#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: &'static str,
        attempts: usize,
        last_error: String,
    },

    #[error("Invalid LLM request: {0}")]
    InvalidRequest(String),
}

// ========== Convenience constructors ==========

impl PipelineError {
    pub fn extraction_failed(filename: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::ExtractionFailed {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }

    pub fn analysis_failed(filename: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::AnalysisFailed {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias used across the pipeline
pub type PipelineResult<T> = Result<T, PipelineError>;
