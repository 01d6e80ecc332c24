//! Response bodies for the batch strategies

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::ErrorKind;
use crate::models::{
    Category, ChannelSummary, Classification, ConsolidatedAnalysis, FileInfo, FileOutcome,
    StageResult,
};

/// Characters of extracted text echoed back per file
pub const TEXT_PREVIEW_CHARS: usize = 1000;

pub fn text_preview(text: &str) -> String {
    text.chars().take(TEXT_PREVIEW_CHARS).collect()
}

/// Analysis payload of a successful file
pub fn analysis_value(result: StageResult) -> JsonValue {
    match result {
        StageResult::Analysis(value) => value,
        StageResult::Classification(c) => serde_json::to_value(c).unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleFileReport {
    pub filename: String,
    pub analysis: JsonValue,
    pub status: &'static str,
    pub extracted_text: String,
    pub processing_time: f64,
}

/// One entry of the individual strategy, tagged by `status`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IndividualEntry {
    Success {
        filename: String,
        analysis: JsonValue,
        extracted_text: String,
    },
    Failed {
        filename: String,
        error: String,
        error_kind: ErrorKind,
    },
}

impl From<FileOutcome> for IndividualEntry {
    fn from(outcome: FileOutcome) -> Self {
        match outcome {
            FileOutcome::Success {
                filename,
                text,
                result,
            } => IndividualEntry::Success {
                filename,
                analysis: analysis_value(result),
                extracted_text: text_preview(&text),
            },
            FileOutcome::Failure {
                filename,
                kind,
                message,
            } => IndividualEntry::Failed {
                filename,
                error: message,
                error_kind: kind,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndividualReport {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<IndividualEntry>,
    pub processing_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationEntry {
    pub filename: String,
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
    pub subcategory: String,
    pub status: EntryStatus,
}

impl ClassificationEntry {
    pub fn success(filename: String, classification: Classification) -> Self {
        Self {
            filename,
            category: classification.category,
            confidence: classification.confidence,
            reasoning: classification.reasoning,
            subcategory: classification.subcategory,
            status: EntryStatus::Success,
        }
    }

    /// Failed files are reported as UNCLASSIFIABLE with zero confidence
    pub fn failure(filename: String, kind: ErrorKind, message: String) -> Self {
        let (subcategory, status) = match kind {
            ErrorKind::ExtractionFailed => ("Extraction Error", EntryStatus::Failed),
            ErrorKind::NoTextExtracted => ("No Text", EntryStatus::Failed),
            ErrorKind::AnalysisTimeout => ("Timeout", EntryStatus::Timeout),
            ErrorKind::DeadlineExceeded => ("Deadline Exceeded", EntryStatus::Timeout),
            _ => ("Classification Error", EntryStatus::Failed),
        };
        Self {
            filename,
            category: Category::Unclassifiable,
            confidence: 0.0,
            reasoning: message,
            subcategory: subcategory.to_string(),
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub total_files: usize,
    pub successful_classifications: usize,
    pub failed_classifications: usize,
    pub classification_results: Vec<ClassificationEntry>,
    pub channel_summary: ChannelSummary,
    pub available_channels: Vec<Category>,
    pub status: &'static str,
    pub processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedReport {
    pub total_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub file_info: Vec<FileInfo>,
    /// Distinct categories in order of first appearance
    pub document_categories: Vec<Category>,
    pub category: Category,
    pub category_conflict: bool,
    pub consolidated_analysis: ConsolidatedAnalysis,
    pub status: &'static str,
    pub processing_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_is_char_bounded() {
        let text = "é".repeat(1500);
        assert_eq!(text_preview(&text).chars().count(), TEXT_PREVIEW_CHARS);
        assert_eq!(text_preview("short"), "short");
    }

    #[test]
    fn individual_entries_are_tagged_by_status() {
        let ok = IndividualEntry::from(FileOutcome::Success {
            filename: "a.pdf".to_string(),
            text: "hello".to_string(),
            result: StageResult::Analysis(json!({"document_type": "Invoice"})),
        });
        assert_eq!(
            serde_json::to_value(ok).unwrap(),
            json!({
                "status": "success",
                "filename": "a.pdf",
                "analysis": {"document_type": "Invoice"},
                "extracted_text": "hello"
            })
        );

        let failed = IndividualEntry::from(FileOutcome::Failure {
            filename: "b.pdf".to_string(),
            kind: ErrorKind::ExtractionFailed,
            message: "Text extraction failed for 'b.pdf': bad".to_string(),
        });
        let value = serde_json::to_value(failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_kind"], "extraction_failed");
    }

    #[test]
    fn failed_classification_labels() {
        let entry = ClassificationEntry::failure(
            "blank.txt".to_string(),
            ErrorKind::NoTextExtracted,
            "No text".to_string(),
        );
        assert_eq!(entry.category, Category::Unclassifiable);
        assert_eq!(entry.confidence, 0.0);
        assert_eq!(entry.subcategory, "No Text");

        let timeout = ClassificationEntry::failure(
            "slow.pdf".to_string(),
            ErrorKind::AnalysisTimeout,
            "Analysis timeout".to_string(),
        );
        assert_eq!(serde_json::to_value(&timeout).unwrap()["status"], "timeout");
    }
}
