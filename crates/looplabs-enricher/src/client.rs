//! Chat-completion HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{EnrichError, EnrichResult};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::PromptEnricher;

/// Instruction sent as the system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are LoopLabs AI Assistant. Expand short creative prompts into full cinematic descriptions for video generation, including visual mood, style, tone, transitions, and scene ideas.";

/// Configuration for the enricher.
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Bearer credential; enrichment is disabled without it
    pub api_key: Option<String>,
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
    /// System message
    pub system_prompt: String,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl EnricherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("ENRICH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            system_prompt: defaults.system_prompt,
        }
    }

    /// Whether a credential is present.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Prompt enricher backed by an OpenAI-compatible chat-completion endpoint.
pub struct OpenAiEnricher {
    http: Client,
    api_key: String,
    endpoint: String,
    model: String,
    system_prompt: String,
}

impl OpenAiEnricher {
    /// Create a new enricher. Fails when no API key is configured.
    pub fn new(config: EnricherConfig) -> EnrichResult<Self> {
        let api_key = config.api_key.ok_or(EnrichError::MissingApiKey)?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EnrichError::Network)?;

        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            system_prompt: config.system_prompt,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PromptEnricher for OpenAiEnricher {
    async fn enrich(&self, prompt: &str) -> EnrichResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!(model = %self.model, "Sending enrichment request to {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::RequestFailed(format!(
                "completion API returned {}: {}",
                status, body
            )));
        }

        let completion: ChatResponse = serde_json::from_slice(&response.bytes().await?)?;
        completion
            .first_text()
            .map(str::to_string)
            .ok_or(EnrichError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> EnricherConfig {
        EnricherConfig {
            api_key: Some("test-key".to_string()),
            base_url: format!("{}/v1/", server.uri()),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = EnricherConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_new_requires_key() {
        assert!(matches!(
            OpenAiEnricher::new(EnricherConfig::default()),
            Err(EnrichError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_enrich_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  A slow neon dolly shot.  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let enricher = OpenAiEnricher::new(config(&server)).unwrap();
        let out = enricher.enrich("neon city").await.unwrap();
        assert_eq!(out, "A slow neon dolly shot.");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "neon city");
    }

    #[tokio::test]
    async fn test_error_status_is_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let enricher = OpenAiEnricher::new(config(&server)).unwrap();
        let err = enricher.enrich("neon city").await.unwrap_err();
        match err {
            EnrichError::RequestFailed(msg) => assert!(msg.contains("slow down")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choice_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let enricher = OpenAiEnricher::new(config(&server)).unwrap();
        assert!(matches!(
            enricher.enrich("x").await,
            Err(EnrichError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let enricher = OpenAiEnricher::new(config(&server)).unwrap();
        assert!(matches!(enricher.enrich("x").await, Err(EnrichError::Json(_))));
    }
}
