//! Gemini completion client.
//!
//! Calls `POST {base_url}/models/{model}:generateContent` with a single
//! text part and returns the text of the first candidate's first part.
//!
//! There is no retry or backoff: a failed call is surfaced to the caller
//! as-is. The request timeout is taken from `llm.timeout_secs` when set.

use async_trait::async_trait;
use std::time::Duration;

use bma_core::llm::{CompletionClient, LlmError};

use crate::config::LlmConfig;

/// [`CompletionClient`] backed by the Gemini `generateContent` REST API.
///
/// The API key is read from the environment variable named by
/// `llm.api_key_env` on every call.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error only if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let api_key = std::env::var(&self.api_key_env)
            .map_err(|_| LlmError::Unreachable(format!("{} not set", self.api_key_env)))?;

        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });

        tracing::debug!(model, prompt_len = prompt.len(), "Calling Gemini");

        let response = self
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedJson(format!("invalid Gemini response: {}", e)))?;
        parse_generate_response(&json)
    }
}

/// Extract `candidates[0].content.parts[0].text` from a `generateContent`
/// response.
fn parse_generate_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or(LlmError::EmptyResponse)
}
