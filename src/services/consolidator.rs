//! Consolidated analysis - service layer
//!
//! Turns the surviving texts of a batch into one grouped summary: sample
//! the combined text, attach the field hint of the dominant category and
//! make a single intelligence call under the remaining budget.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::Deadline;
use crate::models::{Category, ConsolidatedAnalysis, ConsolidationRequest, FileInfo};
use crate::services::intelligence::DocumentIntelligence;
use crate::services::prompts::field_hint;

/// Joins per-document texts in the combined input
pub const DOCUMENT_SEPARATOR: &str = "\n\n--- DOCUMENT SEPARATOR ---\n\n";

/// Inserted where the middle of an oversized text was dropped
pub const TRUNCATION_MARKER: &str = "\n\n[... MIDDLE CONTENT TRUNCATED ...]\n\n";

/// Texts longer than this many characters are sampled
pub const SAMPLING_THRESHOLD: usize = 50_000;

/// Characters kept from each end of a sampled text
pub const SAMPLE_EDGE: usize = 25_000;

/// Keeps the head and the tail of a long text. Lengths are in characters.
pub fn sample_text(text: &str) -> String {
    let length = text.chars().count();
    if length <= SAMPLING_THRESHOLD {
        return text.to_string();
    }

    let head_end = text
        .char_indices()
        .nth(SAMPLE_EDGE)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let tail_start = text
        .char_indices()
        .nth(length - SAMPLE_EDGE)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    let mut sample = String::with_capacity(head_end + TRUNCATION_MARKER.len() + text.len() - tail_start);
    sample.push_str(&text[..head_end]);
    sample.push_str(TRUNCATION_MARKER);
    sample.push_str(&text[tail_start..]);
    sample
}

/// First category in input order; GENERAL for an empty batch
pub fn dominant_category(categories: &[Category]) -> Category {
    categories.first().copied().unwrap_or(Category::General)
}

pub struct Consolidator {
    intelligence: Arc<dyn DocumentIntelligence>,
}

impl Consolidator {
    pub fn new(intelligence: Arc<dyn DocumentIntelligence>) -> Self {
        Self { intelligence }
    }

    /// One consolidated call over `combined_text`.
    ///
    /// Exhausted retries yield [`ConsolidatedAnalysis::degraded`]; running
    /// out of budget is `DeadlineExceeded`.
    pub async fn consolidate(
        &self,
        combined_text: &str,
        file_info: Vec<FileInfo>,
        categories: Vec<Category>,
        deadline: &Deadline,
    ) -> PipelineResult<ConsolidatedAnalysis> {
        deadline.ensure_active()?;

        let original_length = combined_text.chars().count();
        let text_sample = sample_text(combined_text);
        if original_length > SAMPLING_THRESHOLD {
            info!(
                "Using sampled text: {} chars (first {} + last {} of {})",
                text_sample.chars().count(),
                SAMPLE_EDGE,
                SAMPLE_EDGE,
                original_length
            );
        } else {
            info!("Using all {} chars for consolidated analysis", original_length);
        }

        let dominant = dominant_category(&categories);
        let request = ConsolidationRequest {
            text_sample,
            original_length,
            file_info,
            categories,
            dominant_category: dominant,
            field_hint: field_hint(dominant),
        };

        let call = self.intelligence.analyze_consolidated(&request);
        match tokio::time::timeout(deadline.remaining(), call).await {
            Err(_) => {
                warn!(
                    "Consolidated analysis exceeded the remaining budget ({:.1}s elapsed)",
                    deadline.elapsed_seconds()
                );
                Err(PipelineError::DeadlineExceeded)
            }
            Ok(Err(e)) => {
                warn!("Consolidated analysis failed, returning degraded result: {}", e);
                Ok(ConsolidatedAnalysis::degraded())
            }
            Ok(Ok(value)) => Ok(ConsolidatedAnalysis::from_response(value)),
        }
    }
}
