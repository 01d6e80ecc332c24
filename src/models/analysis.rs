use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::classification::Category;

/// Per-file metadata handed to the consolidated analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub filename: String,
    /// Length in characters
    pub text_length: usize,
    pub category: Category,
}

/// Pre-classified context for a single-document analysis
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryContext {
    pub category: Category,
    pub subcategory: Option<String>,
}

/// Everything the intelligence service needs for one consolidated call
#[derive(Debug, Clone)]
pub struct ConsolidationRequest {
    /// Combined text after sampling
    pub text_sample: String,
    /// Character count of the combined text before sampling
    pub original_length: usize,
    pub file_info: Vec<FileInfo>,
    /// Category of every surviving file, in input order
    pub categories: Vec<Category>,
    pub dominant_category: Category,
    /// Fields the model should extract for the dominant category
    pub field_hint: &'static [&'static str],
}

/// Grouped summary of a same-category batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub comprehensive_summary: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub key_findings: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub detailed_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub priority_actions: Vec<String>,
    /// Any other keys the model returned, e.g. `key_details`
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ConsolidatedAnalysis {
    /// Result returned when every attempt failed
    pub fn degraded() -> Self {
        Self {
            comprehensive_summary: "Failed to analyze documents".to_string(),
            detailed_recommendations: vec!["Please try again or check document format".to_string()],
            ..Default::default()
        }
    }

    /// Wraps a response that was not a JSON object
    pub fn unexpected_format(raw: JsonValue) -> Self {
        let mut extra = Map::new();
        extra.insert("analysis_output".to_string(), raw);
        Self {
            comprehensive_summary: "Analysis completed but format was unexpected".to_string(),
            detailed_recommendations: vec!["Please check document format".to_string()],
            extra,
            ..Default::default()
        }
    }

    /// Builds the structure from whatever the service returned
    pub fn from_response(value: JsonValue) -> Self {
        if !value.is_object() {
            return Self::unexpected_format(value);
        }
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(analysis) => analysis,
            Err(_) => Self::unexpected_format(value),
        }
    }
}

fn stringify(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(stringify(JsonValue::deserialize(deserializer)?))
}

// Models sometimes return objects or a bare string where a list of strings is expected
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items.into_iter().map(stringify).collect(),
        JsonValue::Null => Vec::new(),
        other => vec![stringify(other)],
    })
}
