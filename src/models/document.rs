use bytes::Bytes;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{ErrorKind, PipelineError};
use crate::models::analysis::CategoryContext;
use crate::models::classification::Classification;

/// Extensions accepted at admission, lower-case with the leading dot
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".pdf", ".docx", ".csv", ".xlsx", ".png", ".jpg", ".jpeg", ".txt", ".rtf", ".pptx", ".odt",
];

/// One uploaded file, immutable once created
#[derive(Debug, Clone)]
pub struct FileTask {
    filename: String,
    bytes: Bytes,
    extension: String,
    /// Category supplied by the caller, steering the analysis prompt
    context: Option<CategoryContext>,
}

impl FileTask {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let extension = extension_of(&filename);
        Self {
            filename,
            bytes: bytes.into(),
            extension,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<CategoryContext>) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> Option<&CategoryContext> {
        self.context.as_ref()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Lower-cased suffix including the dot, or empty
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn meta(&self) -> UploadMeta<'_> {
        UploadMeta {
            filename: &self.filename,
            size: self.size(),
        }
    }
}

/// What admission needs to know about an upload, without its bytes
#[derive(Debug, Clone, Copy)]
pub struct UploadMeta<'a> {
    pub filename: &'a str,
    pub size: u64,
}

impl UploadMeta<'_> {
    pub fn extension(&self) -> String {
        extension_of(self.filename)
    }
}

pub(crate) fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Payload produced by the intelligence step of the pipeline
#[derive(Debug, Clone)]
pub enum StageResult {
    Analysis(JsonValue),
    Classification(Classification),
}

/// Result of driving one file through the pipeline
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Success {
        filename: String,
        /// Full extracted text; responses only expose a preview
        text: String,
        result: StageResult,
    },
    Failure {
        filename: String,
        kind: ErrorKind,
        message: String,
    },
}

impl FileOutcome {
    pub fn failure(filename: impl Into<String>, err: &PipelineError) -> Self {
        FileOutcome::Failure {
            filename: filename.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            FileOutcome::Success { filename, .. } | FileOutcome::Failure { filename, .. } => {
                filename
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }
}
