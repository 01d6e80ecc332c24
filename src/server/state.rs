//! Shared handler state

use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::BatchOrchestrator;

pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    pub fn new(config: Arc<Config>, orchestrator: Arc<BatchOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }
}
