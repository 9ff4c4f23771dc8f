//! Language-model collaborator.
//!
//! Two call shapes: [`LanguageModel::invoke`] for single-shot classification
//! prompts (routing, quality judgment) and [`LanguageModel::stream`] for
//! answer generation, consumed as a lazy sequence of text fragments.
pub mod mock;
pub mod ollama;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

/// Errors that can occur when talking to the language-model service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("model request failed (is `ollama serve` running?): {0}")]
    RequestFailed(String),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    Stream(String),
}

/// A finite, non-restartable sequence of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Trait for language-model implementations.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a prompt and return the complete response text.
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;

    /// Send a prompt and return a stream of response fragments.
    ///
    /// Once consumption starts the stream runs to completion or fails;
    /// there is no cancellation primitive.
    async fn stream(&self, prompt: &str) -> Result<TokenStream, LlmError>;

    /// The model identifier this instance talks to.
    fn model_name(&self) -> &str;
}
