//! Batch orchestrator - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Admission**: judge the whole batch before any file is touched
//! 2. **Budget**: start one `Deadline` per request and share it
//! 3. **Fan-out**: drive every file through `FilePipeline`, in input order
//! 4. **Aggregation**: counts, channel summary, consolidated call
//!
//! Strategies never look inside a file; that is the pipeline's job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ErrorKind, PipelineError, PipelineResult};
use crate::infrastructure::Deadline;
use crate::models::{
    Category, ChannelSummary, FileInfo, FileOutcome, FileTask, StageResult, UploadMeta,
};
use crate::orchestrator::report::{
    analysis_value, text_preview, ClassificationEntry, ClassificationReport, ConsolidatedReport,
    EntryStatus, IndividualEntry, IndividualReport, SingleFileReport,
};
use crate::services::{
    AdmissionGuard, Consolidator, DocumentIntelligence, TextExtractor, DOCUMENT_SEPARATOR,
};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{FileCtx, FilePipeline, StageMode};

pub struct BatchOrchestrator {
    guard: AdmissionGuard,
    pipeline: FilePipeline,
    consolidator: Consolidator,
    request_timeout: Duration,
    max_concurrent_files: usize,
}

impl BatchOrchestrator {
    pub fn new(
        config: &Config,
        extractor: Arc<dyn TextExtractor>,
        intelligence: Arc<dyn DocumentIntelligence>,
    ) -> Self {
        let guard = AdmissionGuard::new(config.admission_limits());
        let pipeline = FilePipeline::new(
            guard.clone(),
            extractor,
            Arc::clone(&intelligence),
            config.temp_dir.as_ref().map(PathBuf::from),
        );

        Self {
            guard,
            pipeline,
            consolidator: Consolidator::new(intelligence),
            request_timeout: config.request_timeout(),
            max_concurrent_files: config.max_concurrent_files.max(1),
        }
    }

    pub fn start_deadline(&self) -> Deadline {
        Deadline::start(self.request_timeout)
    }

    // ========== Single file ==========

    pub async fn analyze_single(&self, task: FileTask) -> PipelineResult<SingleFileReport> {
        let deadline = self.start_deadline();
        self.analyze_single_within(task, &deadline).await
    }

    /// Any per-file failure becomes the request's error
    pub async fn analyze_single_within(
        &self,
        task: FileTask,
        deadline: &Deadline,
    ) -> PipelineResult<SingleFileReport> {
        self.guard.admit(&[task.meta()])?;

        let outcome = self
            .pipeline
            .process(&task, deadline, StageMode::Analyze, FileCtx::single())
            .await?;

        match outcome {
            FileOutcome::Success {
                filename,
                text,
                result,
            } => Ok(SingleFileReport {
                filename,
                analysis: analysis_value(result),
                status: "success",
                extracted_text: text_preview(&text),
                processing_time: deadline.elapsed_seconds(),
            }),
            FileOutcome::Failure { kind, message, .. } => {
                Err(PipelineError::FileFailed { kind, message })
            }
        }
    }

    // ========== Individual ==========

    pub async fn analyze_individually(&self, tasks: Vec<FileTask>) -> PipelineResult<IndividualReport> {
        let deadline = self.start_deadline();
        self.analyze_individually_within(tasks, &deadline).await
    }

    pub async fn analyze_individually_within(
        &self,
        tasks: Vec<FileTask>,
        deadline: &Deadline,
    ) -> PipelineResult<IndividualReport> {
        self.admit(&tasks, "Individual analysis")?;

        let outcomes = self.run_files(&tasks, deadline, StageMode::Analyze).await?;
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let total_files = outcomes.len();
        let results: Vec<IndividualEntry> = outcomes.into_iter().map(IndividualEntry::from).collect();

        log_batch_complete("Individual analysis", successful, total_files, deadline.elapsed_seconds());

        Ok(IndividualReport {
            total_files,
            successful,
            failed: total_files - successful,
            results,
            processing_time: deadline.elapsed_seconds(),
        })
    }

    // ========== Classify only ==========

    pub async fn classify(&self, tasks: Vec<FileTask>) -> PipelineResult<ClassificationReport> {
        let deadline = self.start_deadline();
        self.classify_within(tasks, &deadline).await
    }

    pub async fn classify_within(
        &self,
        tasks: Vec<FileTask>,
        deadline: &Deadline,
    ) -> PipelineResult<ClassificationReport> {
        self.admit(&tasks, "Classification")?;

        let outcomes = self.run_files(&tasks, deadline, StageMode::Classify).await?;

        let mut channel_summary = ChannelSummary::new();
        let mut entries = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                FileOutcome::Success {
                    filename,
                    result: StageResult::Classification(classification),
                    ..
                } => {
                    channel_summary.record(&filename, &classification);
                    entries.push(ClassificationEntry::success(filename, classification));
                }
                FileOutcome::Success { filename, .. } => {
                    warn!("{} produced no classification", filename);
                    entries.push(ClassificationEntry::failure(
                        filename,
                        ErrorKind::AnalysisFailed,
                        "Classification failed: no classification result".to_string(),
                    ));
                }
                FileOutcome::Failure {
                    filename,
                    kind,
                    message,
                } => entries.push(ClassificationEntry::failure(filename, kind, message)),
            }
        }

        let successful = entries
            .iter()
            .filter(|e| e.status == EntryStatus::Success)
            .count();
        info!("Documents fall into {} channel(s)", channel_summary.len());
        log_batch_complete("Classification", successful, tasks.len(), deadline.elapsed_seconds());

        Ok(ClassificationReport {
            total_files: tasks.len(),
            successful_classifications: successful,
            failed_classifications: entries.len() - successful,
            classification_results: entries,
            available_channels: channel_summary.categories(),
            channel_summary,
            status: "success",
            processing_time: deadline.elapsed_seconds(),
        })
    }

    // ========== Consolidated ==========

    pub async fn analyze_consolidated(&self, tasks: Vec<FileTask>) -> PipelineResult<ConsolidatedReport> {
        let deadline = self.start_deadline();
        self.analyze_consolidated_within(tasks, &deadline).await
    }

    /// Phase 1 classifies every file, phase 2 summarises the survivors
    pub async fn analyze_consolidated_within(
        &self,
        tasks: Vec<FileTask>,
        deadline: &Deadline,
    ) -> PipelineResult<ConsolidatedReport> {
        self.admit(&tasks, "Consolidated analysis")?;

        // Phase 1
        let outcomes = self.run_files(&tasks, deadline, StageMode::Classify).await?;

        let mut texts = Vec::new();
        let mut file_info = Vec::new();
        let mut categories = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Success {
                    filename,
                    text,
                    result: StageResult::Classification(classification),
                } => {
                    let category = classification.category;
                    file_info.push(FileInfo {
                        filename,
                        text_length: text.chars().count(),
                        category,
                    });
                    categories.push(category);
                    texts.push(text);
                }
                other => info!("Skipping {} in consolidated analysis", other.filename()),
            }
        }

        let successful_files = file_info.len();
        let failed_files = tasks.len() - successful_files;
        info!(
            "Phase 1 complete: {} successful, {} failed",
            successful_files, failed_files
        );
        if successful_files == 0 {
            return Err(PipelineError::NoProcessableFiles);
        }

        // Phase 2
        deadline.ensure_active()?;

        let document_categories = distinct_in_order(&categories);
        let category = document_categories[0];
        let category_conflict = document_categories.len() > 1;
        if category_conflict {
            warn!(
                "Consolidating mixed categories {:?}; treating {} as primary",
                document_categories, category
            );
        }

        let combined_text = texts.join(DOCUMENT_SEPARATOR);
        info!(
            "Starting consolidated analysis with {} chars, category {}",
            combined_text.chars().count(),
            category
        );
        let consolidated_analysis = self
            .consolidator
            .consolidate(&combined_text, file_info.clone(), categories, deadline)
            .await?;

        log_batch_complete(
            "Consolidated analysis",
            successful_files,
            tasks.len(),
            deadline.elapsed_seconds(),
        );

        Ok(ConsolidatedReport {
            total_files: tasks.len(),
            successful_files,
            failed_files,
            file_info,
            document_categories,
            category,
            category_conflict,
            consolidated_analysis,
            status: "success",
            processing_time: deadline.elapsed_seconds(),
        })
    }

    // ========== Shared plumbing ==========

    fn admit(&self, tasks: &[FileTask], strategy: &str) -> PipelineResult<()> {
        let metas: Vec<UploadMeta<'_>> = tasks.iter().map(FileTask::meta).collect();
        self.guard.admit(&metas)?;
        let total_bytes = metas.iter().map(|m| m.size).sum();
        log_batch_start(strategy, tasks.len(), total_bytes);
        Ok(())
    }

    /// One outcome per task, in input order. At most `max_concurrent_files`
    /// files are in flight; the default of 1 processes them one by one.
    async fn run_files(
        &self,
        tasks: &[FileTask],
        deadline: &Deadline,
        mode: StageMode,
    ) -> PipelineResult<Vec<FileOutcome>> {
        let total = tasks.len();
        // Boxed up front so handler futures stay Send
        let jobs: Vec<BoxFuture<'_, PipelineResult<FileOutcome>>> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| {
                self.process_one(task, deadline, mode, FileCtx::new(i + 1, total))
                    .boxed()
            })
            .collect();
        let results: Vec<PipelineResult<FileOutcome>> = stream::iter(jobs)
            .buffered(self.max_concurrent_files)
            .collect()
            .await;
        results.into_iter().collect()
    }

    /// Deadline expiry is recorded against the file; admission errors abort
    async fn process_one(
        &self,
        task: &FileTask,
        deadline: &Deadline,
        mode: StageMode,
        ctx: FileCtx,
    ) -> PipelineResult<FileOutcome> {
        match self.pipeline.process(task, deadline, mode, ctx).await {
            Err(PipelineError::DeadlineExceeded) => {
                warn!(
                    "{} Request budget of {}s exhausted before {}",
                    ctx,
                    deadline.budget().as_secs(),
                    task.filename()
                );
                Ok(FileOutcome::failure(
                    task.filename(),
                    &PipelineError::DeadlineExceeded,
                ))
            }
            Err(e) if e.is_admission() => {
                warn!("{} {} rejected, aborting the batch: {}", ctx, task.filename(), e);
                Err(e)
            }
            other => other,
        }
    }
}

fn distinct_in_order(categories: &[Category]) -> Vec<Category> {
    let mut distinct = Vec::new();
    for category in categories {
        if !distinct.contains(category) {
            distinct.push(*category);
        }
    }
    distinct
}
