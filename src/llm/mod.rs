//! Completion clients used by the router's selector and by both query engines.
//!
//! Every prompt in the crate goes through [`LlmClient::complete`]: one prompt in, one text out.
//! Providers are chosen once from [`Config`]; nothing here is process-global.

mod gemini;
mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while calling a completion provider.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// Credentials were missing or rejected by the provider.
    #[error("LLM authentication failed: {0}")]
    Authentication(String),
    /// Provider could not be reached.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response (quota, bad request, server error).
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::ProviderUnavailable(error.to_string())
    }
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single prompt and return the trimmed completion text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Build the completion client selected by configuration.
pub fn build_llm_client(config: &Config) -> Result<Arc<dyn LlmClient>, LlmClientError> {
    let client: Arc<dyn LlmClient> = match config.llm_provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.llm_model.clone(),
            config.google_api_key.clone(),
            config.http_timeout,
        )?),
        LlmProvider::Ollama => Arc::new(OllamaClient::new(
            config.ollama_url.clone(),
            config.llm_model.clone(),
            config.http_timeout,
        )?),
    };
    tracing::debug!(provider = ?config.llm_provider, model = %client.model(), "LLM client initialized");
    Ok(client)
}
