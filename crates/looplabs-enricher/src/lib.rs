//! Prompt enrichment through a hosted chat-completion API.
//!
//! The gateway treats enrichment as best effort: [`enrich_or_passthrough`]
//! never fails, it hands back the original prompt when the service does.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use tracing::{info, warn};

pub use client::{EnricherConfig, OpenAiEnricher, DEFAULT_SYSTEM_PROMPT};
pub use error::{EnrichError, EnrichResult};

/// Something that can expand a short prompt.
#[async_trait]
pub trait PromptEnricher: Send + Sync {
    /// Return an expanded version of `prompt`.
    async fn enrich(&self, prompt: &str) -> EnrichResult<String>;
}

/// Outcome of a best-effort enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub prompt: String,
    pub enriched: bool,
    /// Why the original prompt was kept, if enrichment was attempted and failed
    pub error: Option<String>,
}

impl Enrichment {
    fn unchanged(prompt: &str, error: Option<String>) -> Self {
        Self {
            prompt: prompt.to_string(),
            enriched: false,
            error,
        }
    }
}

/// Enrich `prompt`, keeping it unchanged on any failure. One attempt, no retry.
pub async fn enrich_or_passthrough(enricher: &dyn PromptEnricher, prompt: &str) -> Enrichment {
    match enricher.enrich(prompt).await {
        Ok(expanded) => {
            info!(
                original_len = prompt.len(),
                enriched_len = expanded.len(),
                "Prompt enriched"
            );
            Enrichment {
                prompt: expanded,
                enriched: true,
                error: None,
            }
        }
        Err(e) => {
            warn!("Prompt enrichment failed, using original prompt: {}", e);
            Enrichment::unchanged(prompt, Some(e.to_string()))
        }
    }
}
