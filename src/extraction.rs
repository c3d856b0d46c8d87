//! Property extraction client.
//!
//! Turns unstructured listing text into [`PropertyDetails`] with a single
//! LLM call. Not cached: every call hits the provider.

use std::sync::Arc;

use bma_core::llm::{CompletionClient, LlmError};
use bma_core::models::PropertyDetails;
use bma_core::prompt::extraction_prompt;
use bma_core::reply::parse_reply;

pub struct PropertyExtractor {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl PropertyExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Extract property details from listing text.
    ///
    /// Fields the model leaves out come back as zero values.
    pub async fn extract(&self, listing_text: &str) -> Result<PropertyDetails, LlmError> {
        let reply = self
            .client
            .complete(&self.model, &extraction_prompt(listing_text))
            .await?;
        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        parse_reply(&reply)
    }
}
