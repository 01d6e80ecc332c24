//! Admission guard - service layer
//!
//! Decides whether a batch may be processed at all. Runs on upload
//! metadata only, so a rejected batch never reaches the pipeline.

use tracing::warn;

use crate::config::AdmissionLimits;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{UploadMeta, ALLOWED_EXTENSIONS};

#[derive(Debug, Clone)]
pub struct AdmissionGuard {
    limits: AdmissionLimits,
}

impl AdmissionGuard {
    pub fn new(limits: AdmissionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &AdmissionLimits {
        &self.limits
    }

    /// Checks a whole batch: non-empty, count, every type, every size,
    /// then the running total.
    pub fn admit(&self, uploads: &[UploadMeta<'_>]) -> PipelineResult<()> {
        if uploads.is_empty() {
            return Err(PipelineError::NoFilesProvided);
        }

        if uploads.len() > self.limits.max_files {
            warn!(
                "Rejected batch of {} files (max {})",
                uploads.len(),
                self.limits.max_files
            );
            return Err(PipelineError::TooManyFiles {
                count: uploads.len(),
                max: self.limits.max_files,
            });
        }

        for upload in uploads {
            self.check_type(upload)?;
        }

        for upload in uploads {
            self.check_size(upload)?;
        }

        // Stop at the first overflow so nothing after it is looked at
        let mut total: u64 = 0;
        for upload in uploads {
            total = total.saturating_add(upload.size);
            if total > self.limits.max_total_size {
                warn!(
                    "Rejected batch: running total {} bytes exceeds {} bytes",
                    total, self.limits.max_total_size
                );
                return Err(PipelineError::TotalSizeExceeded {
                    total,
                    max_mb: self.limits.max_total_size_mb(),
                });
            }
        }

        Ok(())
    }

    /// Per-file rules (type and size), also applied by the pipeline stage
    pub fn check_file(&self, upload: &UploadMeta<'_>) -> PipelineResult<()> {
        self.check_type(upload)?;
        self.check_size(upload)
    }

    fn check_type(&self, upload: &UploadMeta<'_>) -> PipelineResult<()> {
        let extension = upload.extension();
        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Ok(());
        }
        Err(PipelineError::UnsupportedFileType {
            filename: upload.filename.to_string(),
            extension,
            allowed: ALLOWED_EXTENSIONS.join(", "),
        })
    }

    fn check_size(&self, upload: &UploadMeta<'_>) -> PipelineResult<()> {
        if upload.size > self.limits.max_file_size {
            return Err(PipelineError::FileTooLarge {
                filename: upload.filename.to_string(),
                size: upload.size,
                max_mb: self.limits.max_file_size_mb(),
            });
        }
        Ok(())
    }
}
