//! LLM provider abstraction.
//!
//! The calculator treats the provider as an opaque text-completion service:
//! one prompt in, one free-form reply out. Concrete clients (the Gemini
//! REST client, scripted test doubles) implement [`CompletionClient`].

use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to, or interpreting the reply of, an LLM provider.
///
/// None of these are retried by the calculator.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider could not be reached (network failure, missing API key).
    #[error("LLM provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with a non-success status.
    #[error("LLM provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// The provider answered but returned no candidate text.
    #[error("no content generated")]
    EmptyResponse,

    /// The reply did not contain a parseable JSON object of the expected shape.
    #[error("invalid response format: {0}")]
    MalformedJson(String),
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` to `model` and return the first candidate's text.
    ///
    /// Implementations return [`LlmError::EmptyResponse`] when the provider
    /// produced no candidate text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}
