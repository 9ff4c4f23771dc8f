/// Language-model client backed by a local Ollama server (`/api/generate`).
///
/// `invoke` uses a non-streaming request; `stream` consumes the NDJSON
/// response line by line and yields the text fragments as they arrive.
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use super::{LanguageModel, LlmError, TokenStream};

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    #[must_use]
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn post_generate(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        self.http
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": stream,
            }))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.post_generate(prompt, false).await?;
        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(chunk.response)
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream, LlmError> {
        let response = self.post_generate(prompt, true).await?;

        let byte_stream = response.bytes_stream().map(|r| r.map_err(std::io::Error::other));
        let lines = FramedRead::new(StreamReader::new(byte_stream), LinesCodec::new());

        // One JSON object per line; the `done: true` line carries no text and
        // the server closes the connection after it.
        let fragments = lines.filter_map(|line| async move {
            match line {
                Ok(line) => match serde_json::from_str::<GenerateChunk>(&line) {
                    Ok(chunk) if chunk.done || chunk.response.is_empty() => None,
                    Ok(chunk) => Some(Ok(chunk.response)),
                    Err(e) => Some(Err(LlmError::InvalidResponse(e.to_string()))),
                },
                Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
            }
        });

        Ok(Box::pin(fragments))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
