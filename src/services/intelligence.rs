//! Document intelligence - service layer
//!
//! Classification and analysis calls against the language model. Only
//! answers questions about one text at a time; batching lives upstream.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::clients::{parse_json_content, ChatOptions, LlmClient};
use crate::config::Config;
use crate::error::IntelligenceError;
use crate::models::{CategoryContext, Classification, ConsolidationRequest};
use crate::services::prompts::{self, ANALYSIS_PROMPT, CLASSIFICATION_PROMPT};
use crate::services::retry::with_retries;

const CLASSIFY_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.2,
    max_tokens: None,
};

const ANALYZE_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.2,
    max_tokens: None,
};

const CONSOLIDATE_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.3,
    max_tokens: Some(3000),
};

/// Classification and analysis of extracted text.
///
/// Errors mean every attempt failed; the caller picks the fallback.
#[async_trait]
pub trait DocumentIntelligence: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, IntelligenceError>;

    async fn analyze(
        &self,
        text: &str,
        context: Option<&CategoryContext>,
    ) -> Result<JsonValue, IntelligenceError>;

    async fn analyze_consolidated(
        &self,
        request: &ConsolidationRequest,
    ) -> Result<JsonValue, IntelligenceError>;
}

/// [`DocumentIntelligence`] backed by an OpenAI-compatible chat endpoint
pub struct OpenAiIntelligence {
    llm: LlmClient,
    max_attempts: usize,
}

impl OpenAiIntelligence {
    pub fn new(llm: LlmClient, max_attempts: usize) -> Self {
        info!(
            "🤖 Model {} ({} attempts per call)",
            llm.model_name(),
            max_attempts
        );
        Self { llm, max_attempts }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(LlmClient::new(config), config.llm_max_retries)
    }

    async fn request_json(
        &self,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> anyhow::Result<JsonValue> {
        let content = self.llm.chat_json(system, user, options).await?;
        debug!("LLM response: {}", content);
        Ok(parse_json_content(&content)?)
    }
}

#[async_trait]
impl DocumentIntelligence for OpenAiIntelligence {
    async fn classify(&self, text: &str) -> Result<Classification, IntelligenceError> {
        info!("Classifying document ({} chars)", text.chars().count());

        let value = with_retries("classification", self.max_attempts, || {
            self.request_json(CLASSIFICATION_PROMPT, text, CLASSIFY_OPTIONS)
        })
        .await?;

        // A well-formed answer without a category is not retried
        Ok(Classification::from_json(&value).unwrap_or_else(|| {
            warn!("Unexpected classification format: {}", value);
            Classification::unrecognized()
        }))
    }

    async fn analyze(
        &self,
        text: &str,
        context: Option<&CategoryContext>,
    ) -> Result<JsonValue, IntelligenceError> {
        info!(
            "Analyzing document ({} chars, category: {})",
            text.chars().count(),
            context
                .map(|c| c.category.as_str())
                .unwrap_or("unclassified")
        );
        let (system, user) = prompts::analysis_messages(text, context);

        with_retries("analysis", self.max_attempts, || {
            self.request_json(system, &user, ANALYZE_OPTIONS)
        })
        .await
    }

    async fn analyze_consolidated(
        &self,
        request: &ConsolidationRequest,
    ) -> Result<JsonValue, IntelligenceError> {
        let user = prompts::consolidation_message(request);
        info!(
            "Consolidated analysis of {} documents, prompt length: {} chars",
            request.file_info.len(),
            user.chars().count()
        );

        with_retries("consolidated analysis", self.max_attempts, || {
            self.request_json(ANALYSIS_PROMPT, &user, CONSOLIDATE_OPTIONS)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    /// Live classification against the configured endpoint
    ///
    /// ```bash
    /// cargo test live_classify -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn live_classify() {
        let _ = tracing_subscriber::fmt::try_init();
        let intelligence = OpenAiIntelligence::from_config(&Config::from_env());
        let classification = intelligence
            .classify("Invoice INV-2025-001. Amount due: 544.16 EUR by 20.04.2025. IBAN DE48...")
            .await
            .expect("live classification failed");
        assert_eq!(classification.category, Category::Payments);
    }
}
