use crate::config::Config;
use crate::orchestrator::BatchOrchestrator;
use crate::server::{build_router, AppState};
use crate::services::{
    DocumentIntelligence, LocalTextExtractor, OpenAiIntelligence, TesseractOcr, TextExtractor,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Application: the configured orchestrator plus its HTTP listener
pub struct App {
    config: Arc<Config>,
    state: Arc<AppState>,
}

impl App {
    /// Builds the production collaborators from config
    pub async fn initialize(config: Config) -> Result<Self> {
        if config.llm_api_key.is_empty() {
            warn!("⚠️ OPENAI_API_KEY is not set, model calls will fail");
        }

        let extractor = match TesseractOcr::from_config(&config) {
            Some(ocr) => {
                info!("📷 OCR enabled (language: {})", config.ocr_language);
                LocalTextExtractor::with_ocr(ocr)
            }
            None => {
                warn!("⚠️ OCR disabled, images and scanned PDFs cannot be read");
                LocalTextExtractor::new()
            }
        };
        let extractor: Arc<dyn TextExtractor> = Arc::new(extractor);
        let intelligence: Arc<dyn DocumentIntelligence> =
            Arc::new(OpenAiIntelligence::from_config(&config));

        Ok(Self::with_collaborators(config, extractor, intelligence))
    }

    pub fn with_collaborators(
        config: Config,
        extractor: Arc<dyn TextExtractor>,
        intelligence: Arc<dyn DocumentIntelligence>,
    ) -> Self {
        let orchestrator = Arc::new(BatchOrchestrator::new(&config, extractor, intelligence));
        let config = Arc::new(config);
        let state = Arc::new(AppState::new(Arc::clone(&config), orchestrator));
        Self { config, state }
    }

    /// Serves until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("✓ Listening on http://{}", addr);

        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("👋 Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
