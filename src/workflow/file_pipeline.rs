//! File pipeline - workflow layer
//!
//! Defines what happens to one uploaded file:
//!
//! 1. per-file admission (type, size)
//! 2. scoped temp copy
//! 3. text extraction on the blocking pool
//! 4. classification or analysis
//!
//! Every step is gated on the request deadline. Anything that goes wrong
//! for this file becomes a `FileOutcome::Failure`; only admission errors
//! and an expired deadline are returned as `Err`.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::{Deadline, ScopedTempFile};
use crate::models::{CategoryContext, Classification, FileOutcome, FileTask, StageResult};
use crate::services::{AdmissionGuard, DocumentIntelligence, TextExtractor};
use crate::utils::logging::truncate_text;
use crate::workflow::file_ctx::FileCtx;

/// What the intelligence step does with the extracted text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    Analyze,
    Classify,
}

/// Drives a single file from bytes to a [`FileOutcome`]
///
/// - holds no per-request state
/// - never sees the rest of the batch
/// - owns nothing but the collaborators
pub struct FilePipeline {
    guard: AdmissionGuard,
    extractor: Arc<dyn TextExtractor>,
    intelligence: Arc<dyn DocumentIntelligence>,
    temp_dir: Option<PathBuf>,
}

impl FilePipeline {
    pub fn new(
        guard: AdmissionGuard,
        extractor: Arc<dyn TextExtractor>,
        intelligence: Arc<dyn DocumentIntelligence>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            guard,
            extractor,
            intelligence,
            temp_dir,
        }
    }

    pub async fn process(
        &self,
        task: &FileTask,
        deadline: &Deadline,
        mode: StageMode,
        ctx: FileCtx,
    ) -> PipelineResult<FileOutcome> {
        let filename = task.filename();
        info!("{} Processing {} ({} bytes)", ctx, filename, task.size());

        // ========== Step 1: per-file admission ==========
        deadline.ensure_active()?;
        self.guard.check_file(&task.meta())?;

        // ========== Step 2: scoped temp copy ==========
        deadline.ensure_active()?;
        let temp_file =
            match ScopedTempFile::write(task.bytes(), task.extension(), self.temp_dir.as_deref()) {
                Ok(file) => file,
                Err(e) => {
                    warn!("{} Could not stage {}: {}", ctx, filename, e);
                    let err = PipelineError::extraction_failed(
                        filename,
                        format!("could not write temporary file: {}", e),
                    );
                    return Ok(FileOutcome::failure(filename, &err));
                }
            };

        // ========== Step 3: text extraction ==========
        deadline.ensure_active()?;
        let text = match self.extract(task, &temp_file, deadline, ctx).await {
            Ok(text) => text,
            Err(err) => return Ok(FileOutcome::failure(filename, &err)),
        };
        debug!("{} Text preview: {}", ctx, truncate_text(&text, 200));

        // ========== Step 4: intelligence ==========
        deadline.ensure_active()?;
        let outcome = match mode {
            StageMode::Classify => self.classify(filename, text, deadline, ctx).await,
            StageMode::Analyze => {
                self.analyze(filename, text, task.context(), deadline, ctx)
                    .await
            }
        };

        drop(temp_file);
        Ok(outcome)
    }

    async fn extract(
        &self,
        task: &FileTask,
        temp_file: &ScopedTempFile,
        deadline: &Deadline,
        ctx: FileCtx,
    ) -> PipelineResult<String> {
        let filename = task.filename();
        let extractor = Arc::clone(&self.extractor);
        let path = temp_file.path_buf();
        let bytes = task.bytes().clone();

        let job = tokio::task::spawn_blocking(move || extractor.extract(&path, &bytes));
        let text = match tokio::time::timeout(deadline.remaining(), job).await {
            Err(_) => {
                warn!("{} Text extraction timed out for {}", ctx, filename);
                return Err(PipelineError::extraction_failed(
                    filename,
                    format!(
                        "text extraction timed out after {:.1}s",
                        deadline.elapsed_seconds()
                    ),
                ));
            }
            Ok(Err(join_error)) => {
                warn!("{} Extraction task aborted for {}: {}", ctx, filename, join_error);
                return Err(PipelineError::extraction_failed(filename, join_error));
            }
            Ok(Ok(Err(e))) => {
                warn!("{} Text extraction failed for {}: {}", ctx, filename, e);
                return Err(PipelineError::extraction_failed(filename, e));
            }
            Ok(Ok(Ok(text))) => text,
        };

        if text.trim().is_empty() {
            warn!("{} No text extracted from {}", ctx, filename);
            return Err(PipelineError::NoTextExtracted {
                filename: filename.to_string(),
            });
        }

        info!(
            "{} Extracted {} chars from {}",
            ctx,
            text.chars().count(),
            filename
        );
        Ok(text)
    }

    async fn classify(
        &self,
        filename: &str,
        text: String,
        deadline: &Deadline,
        ctx: FileCtx,
    ) -> FileOutcome {
        let call = self.intelligence.classify(&text);
        let classification = match tokio::time::timeout(deadline.remaining(), call).await {
            Err(_) => {
                warn!("{} Classification timed out for {}", ctx, filename);
                let err = PipelineError::AnalysisTimeout {
                    filename: filename.to_string(),
                };
                return FileOutcome::failure(filename, &err);
            }
            Ok(Err(e)) => {
                warn!("{} {}; using fallback classification", ctx, e);
                Classification::fallback()
            }
            Ok(Ok(classification)) => classification,
        };

        info!(
            "{} ✓ {} → {} ({:.2})",
            ctx, filename, classification.category, classification.confidence
        );
        FileOutcome::Success {
            filename: filename.to_string(),
            text,
            result: StageResult::Classification(classification),
        }
    }

    async fn analyze(
        &self,
        filename: &str,
        text: String,
        context: Option<&CategoryContext>,
        deadline: &Deadline,
        ctx: FileCtx,
    ) -> FileOutcome {
        if let Some(context) = context {
            debug!("{} Analysing {} as {}", ctx, filename, context.category);
        }
        let call = self.intelligence.analyze(&text, context);
        let analysis = match tokio::time::timeout(deadline.remaining(), call).await {
            Err(_) => {
                warn!("{} Analysis timed out for {}", ctx, filename);
                let err = PipelineError::AnalysisTimeout {
                    filename: filename.to_string(),
                };
                return FileOutcome::failure(filename, &err);
            }
            Ok(Err(e)) => {
                warn!("{} Analysis failed for {}: {}", ctx, filename, e);
                return FileOutcome::failure(filename, &PipelineError::analysis_failed(filename, e));
            }
            Ok(Ok(value)) => normalize_analysis(value),
        };

        info!("{} ✓ {} analyzed", ctx, filename);
        FileOutcome::Success {
            filename: filename.to_string(),
            text,
            result: StageResult::Analysis(analysis),
        }
    }
}

/// Analysis results are always JSON objects
fn normalize_analysis(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(_) => value,
        JsonValue::String(text) => json!({ "analysis_output": text }),
        other => json!({ "analysis_output": other.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionLimits;
    use crate::error::{ErrorKind, ExtractionError, IntelligenceError};
    use crate::models::{Category, CategoryContext, ConsolidationRequest};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Extractor returning the upload as text, recording the path it saw
    struct EchoExtractor {
        seen: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl EchoExtractor {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl TextExtractor for EchoExtractor {
        fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractionError> {
            assert!(path.exists(), "temp copy must exist during extraction");
            self.seen.lock().unwrap().push(path.to_path_buf());
            if self.fail {
                return Err(ExtractionError::Pdf("corrupt xref table".to_string()));
            }
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    struct SlowExtractor;

    impl TextExtractor for SlowExtractor {
        fn extract(&self, _path: &Path, _bytes: &[u8]) -> Result<String, ExtractionError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".to_string())
        }
    }

    enum Behaviour {
        Ok,
        Fail,
        Hang,
        NotAnObject,
    }

    struct FakeIntelligence {
        behaviour: Behaviour,
    }

    #[async_trait]
    impl DocumentIntelligence for FakeIntelligence {
        async fn classify(&self, text: &str) -> Result<Classification, IntelligenceError> {
            match self.behaviour {
                Behaviour::Fail => Err(IntelligenceError::Exhausted {
                    operation: "classification",
                    attempts: 3,
                    last_error: "rate limited".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
                _ => Ok(Classification {
                    category: Category::parse_lenient(text.split_whitespace().next().unwrap_or("")),
                    confidence: 0.9,
                    reasoning: "keyword".to_string(),
                    subcategory: "Sales Invoice".to_string(),
                }),
            }
        }

        async fn analyze(
            &self,
            _text: &str,
            context: Option<&CategoryContext>,
        ) -> Result<JsonValue, IntelligenceError> {
            match self.behaviour {
                Behaviour::Ok => Ok(json!({
                    "document_type": "Invoice",
                    "category": context.map(|c| c.category.as_str()),
                })),
                Behaviour::NotAnObject => Ok(json!("just prose")),
                Behaviour::Fail => Err(IntelligenceError::Exhausted {
                    operation: "analysis",
                    attempts: 3,
                    last_error: "bad json".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        }

        async fn analyze_consolidated(
            &self,
            _request: &ConsolidationRequest,
        ) -> Result<JsonValue, IntelligenceError> {
            unreachable!("not used by the file pipeline")
        }
    }

    fn pipeline(
        extractor: Arc<dyn TextExtractor>,
        behaviour: Behaviour,
        dir: &TempDir,
    ) -> FilePipeline {
        FilePipeline::new(
            AdmissionGuard::new(AdmissionLimits {
                max_files: 10,
                max_file_size: 1024,
                max_total_size: 4096,
            }),
            extractor,
            Arc::new(FakeIntelligence { behaviour }),
            Some(dir.path().to_path_buf()),
        )
    }

    fn fresh() -> Deadline {
        Deadline::start(Duration::from_secs(60))
    }

    fn assert_dir_empty(dir: &TempDir) {
        assert_eq!(
            std::fs::read_dir(dir.path()).unwrap().count(),
            0,
            "temp file leaked"
        );
    }

    fn failure_kind(outcome: &FileOutcome) -> ErrorKind {
        match outcome {
            FileOutcome::Failure { kind, .. } => *kind,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn classify_success_keeps_full_text() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = EchoExtractor::new(false);
        let stage = pipeline(extractor.clone(), Behaviour::Ok, &dir);
        let task = FileTask::new("a.txt", "PAYMENTS invoice 42");

        let outcome = stage
            .process(&task, &fresh(), StageMode::Classify, FileCtx::single())
            .await
            .unwrap();

        match outcome {
            FileOutcome::Success { text, result, .. } => {
                assert_eq!(text, "PAYMENTS invoice 42");
                match result {
                    StageResult::Classification(c) => assert_eq!(c.category, Category::Payments),
                    other => panic!("unexpected result {:?}", other),
                }
            }
            other => panic!("expected success, got {:?}", other),
        }
        let seen = extractor.seen.lock().unwrap();
        assert!(seen[0].to_string_lossy().ends_with(".txt"));
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn caller_category_reaches_the_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(EchoExtractor::new(false), Behaviour::Ok, &dir);
        let hinted = FileTask::new("a.txt", "Q1 return").with_context(Some(CategoryContext {
            category: Category::Vat,
            subcategory: None,
        }));

        for (task, expected) in [
            (hinted, json!("VAT")),
            (FileTask::new("b.txt", "Q1 return"), JsonValue::Null),
        ] {
            let outcome = stage
                .process(&task, &fresh(), StageMode::Analyze, FileCtx::single())
                .await
                .unwrap();
            match outcome {
                FileOutcome::Success {
                    result: StageResult::Analysis(analysis),
                    ..
                } => assert_eq!(analysis["category"], expected),
                other => panic!("expected analysis, got {:?}", other),
            }
        }
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn exhausted_classification_falls_back_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(EchoExtractor::new(false), Behaviour::Fail, &dir);
        let outcome = stage
            .process(&FileTask::new("a.txt", "text"), &fresh(), StageMode::Classify, FileCtx::single())
            .await
            .unwrap();
        match outcome {
            FileOutcome::Success {
                result: StageResult::Classification(c),
                ..
            } => assert_eq!(c, Classification::fallback()),
            other => panic!("expected fallback success, got {:?}", other),
        }
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn extraction_error_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(EchoExtractor::new(true), Behaviour::Ok, &dir);
        let outcome = stage
            .process(&FileTask::new("scan.pdf", "%PDF"), &fresh(), StageMode::Analyze, FileCtx::single())
            .await
            .unwrap();
        assert_eq!(failure_kind(&outcome), ErrorKind::ExtractionFailed);
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(EchoExtractor::new(false), Behaviour::Ok, &dir);
        let outcome = stage
            .process(&FileTask::new("blank.txt", " \n\t "), &fresh(), StageMode::Classify, FileCtx::single())
            .await
            .unwrap();
        assert_eq!(failure_kind(&outcome), ErrorKind::NoTextExtracted);
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn analysis_failure_and_timeout_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let failing = pipeline(EchoExtractor::new(false), Behaviour::Fail, &dir);
        let outcome = failing
            .process(&FileTask::new("a.txt", "text"), &fresh(), StageMode::Analyze, FileCtx::single())
            .await
            .unwrap();
        assert_eq!(failure_kind(&outcome), ErrorKind::AnalysisFailed);

        let hanging = pipeline(EchoExtractor::new(false), Behaviour::Hang, &dir);
        let short = Deadline::start(Duration::from_millis(300));
        let outcome = hanging
            .process(&FileTask::new("a.txt", "text"), &short, StageMode::Analyze, FileCtx::single())
            .await
            .unwrap();
        assert_eq!(failure_kind(&outcome), ErrorKind::AnalysisTimeout);
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn slow_extraction_is_bounded_by_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(Arc::new(SlowExtractor), Behaviour::Ok, &dir);
        let short = Deadline::start(Duration::from_millis(50));
        let outcome = stage
            .process(&FileTask::new("a.txt", "text"), &short, StageMode::Classify, FileCtx::single())
            .await
            .unwrap();
        match outcome {
            FileOutcome::Failure { kind, message, .. } => {
                assert_eq!(kind, ErrorKind::ExtractionFailed);
                assert!(message.contains("timed out"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn non_object_analysis_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let stage = pipeline(EchoExtractor::new(false), Behaviour::NotAnObject, &dir);
        let outcome = stage
            .process(&FileTask::new("a.txt", "text"), &fresh(), StageMode::Analyze, FileCtx::single())
            .await
            .unwrap();
        match outcome {
            FileOutcome::Success {
                result: StageResult::Analysis(value),
                ..
            } => assert_eq!(value, json!({"analysis_output": "just prose"})),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn admission_errors_abort_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = EchoExtractor::new(false);
        let stage = pipeline(extractor.clone(), Behaviour::Ok, &dir);

        let result = stage
            .process(&FileTask::new("tool.exe", "MZ"), &fresh(), StageMode::Analyze, FileCtx::single())
            .await;
        assert!(matches!(result, Err(PipelineError::UnsupportedFileType { .. })));

        let big = FileTask::new("big.txt", vec![b'x'; 2048]);
        let result = stage
            .process(&big, &fresh(), StageMode::Analyze, FileCtx::single())
            .await;
        assert!(matches!(result, Err(PipelineError::FileTooLarge { .. })));

        assert!(extractor.seen.lock().unwrap().is_empty());
        assert_dir_empty(&dir);
    }

    #[tokio::test]
    async fn expired_deadline_is_returned_not_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = EchoExtractor::new(false);
        let stage = pipeline(extractor.clone(), Behaviour::Ok, &dir);
        let past = Instant::now()
            .checked_sub(Duration::from_secs(10))
            .unwrap_or_else(Instant::now);
        let expired = Deadline::started_at(past, Duration::from_secs(1));

        let result = stage
            .process(&FileTask::new("a.txt", "text"), &expired, StageMode::Classify, FileCtx::single())
            .await;
        assert!(matches!(result, Err(PipelineError::DeadlineExceeded)));
        assert!(extractor.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn normalize_keeps_objects() {
        assert_eq!(normalize_analysis(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(normalize_analysis(json!(7)), json!({"analysis_output": "7"}));
    }
}
