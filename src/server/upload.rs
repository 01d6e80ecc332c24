//! Multipart decoding into `FileTask`s
//!
//! Any form field that carries a filename is an upload. Of the plain form
//! values only `category` and `subcategory` are read; they steer the
//! analysis prompt of every file in the request. Count and size limits are
//! enforced while the body streams in, so an oversized batch is rejected
//! without buffering it. Type checks and the full ordered admission still
//! run in `AdmissionGuard`.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::BytesMut;
use tracing::{debug, warn};

use crate::config::AdmissionLimits;
use crate::error::PipelineError;
use crate::models::{Category, CategoryContext, FileTask};
use crate::server::error::ApiError;

/// Running count and byte totals of one request's uploads
#[derive(Debug)]
struct UploadBudget {
    limits: AdmissionLimits,
    files: usize,
    total: u64,
}

impl UploadBudget {
    fn new(limits: AdmissionLimits) -> Self {
        Self {
            limits,
            files: 0,
            total: 0,
        }
    }

    /// Called when a file field starts, before any of its bytes are read
    fn start_file(&mut self) -> Result<(), PipelineError> {
        self.files += 1;
        if self.files > self.limits.max_files {
            return Err(PipelineError::TooManyFiles {
                count: self.files,
                max: self.limits.max_files,
            });
        }
        Ok(())
    }

    /// Checks a file that has grown to `size` bytes so far
    fn check_growth(&self, filename: &str, size: u64) -> Result<(), PipelineError> {
        if size > self.limits.max_file_size {
            return Err(PipelineError::FileTooLarge {
                filename: filename.to_string(),
                size,
                max_mb: self.limits.max_file_size_mb(),
            });
        }
        let total = self.total.saturating_add(size);
        if total > self.limits.max_total_size {
            return Err(PipelineError::TotalSizeExceeded {
                total,
                max_mb: self.limits.max_total_size_mb(),
            });
        }
        Ok(())
    }

    fn finish_file(&mut self, size: u64) {
        self.total = self.total.saturating_add(size);
    }
}

/// Optional `category`/`subcategory` form values
#[derive(Debug, Default)]
struct CategoryHint {
    category: Option<Category>,
    subcategory: Option<String>,
}

impl CategoryHint {
    fn set(&mut self, name: &str, value: &str) {
        let value = value.trim();
        match name {
            "category" => {
                self.category = Category::parse(value);
                if self.category.is_none() {
                    warn!("Ignoring unknown category hint '{}'", value);
                }
            }
            "subcategory" if !value.is_empty() => self.subcategory = Some(value.to_string()),
            _ => {}
        }
    }

    /// A subcategory alone is not enough to pick the category prompt
    fn context(&self) -> Option<CategoryContext> {
        self.category.map(|category| CategoryContext {
            category,
            subcategory: self.subcategory.clone(),
        })
    }
}

/// Every file field, in the order the client sent them
pub async fn read_files(
    multipart: &mut Multipart,
    limits: AdmissionLimits,
) -> Result<Vec<FileTask>, ApiError> {
    let mut budget = UploadBudget::new(limits);
    let mut hint = CategoryHint::default();
    let mut tasks = Vec::new();
    while let Some(task) = next_file(multipart, &mut budget, &mut hint).await? {
        tasks.push(task);
    }

    let context = hint.context();
    Ok(tasks
        .into_iter()
        .map(|task| task.with_context(context.clone()))
        .collect())
}

/// The first file field; later fields are not read, so a category hint
/// must come before the file
pub async fn read_first_file(
    multipart: &mut Multipart,
    limits: AdmissionLimits,
) -> Result<Option<FileTask>, ApiError> {
    let mut budget = UploadBudget::new(limits);
    let mut hint = CategoryHint::default();
    let task = next_file(multipart, &mut budget, &mut hint).await?;
    Ok(task.map(|task| task.with_context(hint.context())))
}

async fn next_file(
    multipart: &mut Multipart,
    budget: &mut UploadBudget,
    hint: &mut CategoryHint,
) -> Result<Option<FileTask>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ApiError::from_multipart(e, budget.limits)),
        };

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let name = field.name().unwrap_or_default().to_string();
                if name == "category" || name == "subcategory" {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::from_multipart(e, budget.limits))?;
                    hint.set(&name, &value);
                } else {
                    debug!("Skipping form field {:?}", name);
                }
                continue;
            }
        };

        budget.start_file().map_err(|e| reject(&filename, e))?;
        let bytes = read_field(field, &filename, budget).await?;
        debug!("Received upload '{}' ({} bytes)", filename, bytes.len());
        return Ok(Some(FileTask::new(filename, bytes.freeze())));
    }
}

async fn read_field(
    mut field: Field<'_>,
    filename: &str,
    budget: &mut UploadBudget,
) -> Result<BytesMut, ApiError> {
    let mut buf = BytesMut::new();
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => return Err(ApiError::from_multipart(e, budget.limits)),
        };
        let size = (buf.len() + chunk.len()) as u64;
        budget
            .check_growth(filename, size)
            .map_err(|e| reject(filename, e))?;
        buf.extend_from_slice(&chunk);
    }
    budget.finish_file(buf.len() as u64);
    Ok(buf)
}

fn reject(filename: &str, err: PipelineError) -> ApiError {
    warn!("Upload stopped at '{}': {}", filename, err);
    ApiError::Pipeline(err)
}
