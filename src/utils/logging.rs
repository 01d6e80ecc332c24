//! Logging setup and formatting helpers

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let default_directives = if verbose {
        "document_triage=debug,tower_http=debug"
    } else {
        "document_triage=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Startup banner
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Document Analysis API starting");
    info!(
        "Started at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📡 Listening on {}:{}", config.host, config.port);
    info!("🤖 Model: {}", config.llm_model_name);
    info!(
        "📏 Limits: {} files, {}MB per file, {}MB per request",
        config.max_files_per_request, config.max_file_size_mb, config.max_total_size_mb
    );
    info!(
        "⏱️ Request timeout: {}s, concurrent files: {}",
        config.request_timeout_seconds, config.max_concurrent_files
    );
    info!("{}", "=".repeat(60));
}

/// Batch start banner
///
/// # Arguments
/// - `strategy`: which endpoint is running
/// - `total`: number of files admitted
/// - `total_bytes`: combined upload size
pub fn log_batch_start(strategy: &str, total: usize, total_bytes: u64) {
    info!("{}", "=".repeat(60));
    info!("📦 {}: {} file(s), {} bytes", strategy, total, total_bytes);
    info!("{}", "=".repeat(60));
}

pub fn log_batch_complete(strategy: &str, successful: usize, total: usize, elapsed_seconds: f64) {
    info!("{}", "─".repeat(60));
    info!(
        "✓ {} finished: {}/{} succeeded in {:.2}s",
        strategy, successful, total, elapsed_seconds
    );
    info!("{}", "─".repeat(60));
}

/// Shortens long text for log output
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
