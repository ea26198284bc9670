//! Application state.

use std::sync::Arc;

use looplabs_enricher::{OpenAiEnricher, PromptEnricher};
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::services::JobOrchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        tokio::fs::create_dir_all(&config.output_root).await?;

        let enricher: Option<Arc<dyn PromptEnricher>> = if config.enricher.is_enabled() {
            let client = OpenAiEnricher::new(config.enricher.clone())?;
            info!("Prompt enrichment enabled (model {})", client.model());
            Some(Arc::new(client))
        } else {
            warn!("OPENAI_API_KEY not set, prompts will be passed through unchanged");
            None
        };

        let orchestrator = JobOrchestrator::new(&config.output_root, &config.engine, enricher);

        Ok(Self::with_orchestrator(config, orchestrator))
    }

    /// Build state around an existing orchestrator.
    pub fn with_orchestrator(config: ApiConfig, orchestrator: JobOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
