use anyhow::Result;
use document_triage::utils::logging;
use document_triage::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    logging::init(config.verbose_logging)?;
    logging::log_startup(&config);

    App::initialize(config).await?.run().await
}
