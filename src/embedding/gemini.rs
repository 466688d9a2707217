use super::{EmbeddingClient, EmbeddingClientError, ensure_count};
use crate::http::build_client;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini caps `batchEmbedContents` at 100 requests per call.
const MAX_BATCH: usize = 100;

/// Embedding client for the hosted Gemini `batchEmbedContents` endpoint.
pub struct GeminiEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiEmbeddingClient {
    /// Create a client; a missing key is only reported when embeddings are requested.
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_client("askpdf/embedding", timeout)?,
            base_url,
            model,
            api_key,
        })
    }

    fn model_path(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("models/{model}")
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/{}:batchEmbedContents",
            self.base_url.trim_end_matches('/'),
            self.model_path()
        )
    }

    async fn embed_batch(
        &self,
        api_key: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let model = self.model_path();
        let payload = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::Authentication(format!(
                "Gemini returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Gemini embeddings: {error}"
            ))
        })?;
        let embeddings: Vec<Vec<f32>> = body.embeddings.into_iter().map(|e| e.values).collect();
        ensure_count(texts.len(), &embeddings)?;
        Ok(embeddings)
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EmbeddingClientError::Authentication("GOOGLE_API_KEY is not set".into())
        })?;

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            tracing::debug!(model = %self.model, batch = batch.len(), "Requesting Gemini embeddings");
            embeddings.extend(self.embed_batch(api_key, batch).await?);
        }
        Ok(embeddings)
    }
}
