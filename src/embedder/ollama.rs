/// Embedding client backed by a local Ollama server (`/api/embeddings`).
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, EmbedderError};

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Embeds text through the Ollama embeddings endpoint.
///
/// The configured model identity must match between index build and query
/// time; the store verifies the recorded dimensionality on open.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: &str, model: &str, dimensions: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| {
                EmbedderError::RequestFailed(format!(
                    "cannot reach embedding service at {url} (is `ollama serve` running?): {e}"
                ))
            })?
            .error_for_status()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        if body.embedding.len() != self.dimensions {
            return Err(EmbedderError::InvalidResponse(format!(
                "model {} returned {} dimensions, expected {}",
                self.model,
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        // The embeddings endpoint is single-prompt; batch sequentially.
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
