//! Operator-editable LLM instructions.
//!
//! Exactly one instructions document is kept live. Replacing it also
//! drops every cached report, since any report may depend on the text.

use chrono::Utc;

use bma_core::models::LlmInstructions;

use crate::error::Result;
use crate::service::BmaService;

impl BmaService {
    /// Current instructions text; empty when none have been saved.
    pub async fn get_instructions(&self) -> Result<String> {
        Ok(self
            .store
            .get_instructions()
            .await?
            .map(|i| i.instructions)
            .unwrap_or_default())
    }

    /// Replace the instructions and invalidate all cached reports.
    ///
    /// Returns the number of cached reports removed.
    pub async fn update_instructions(&self, text: &str) -> Result<u64> {
        self.store.delete_all_instructions().await?;
        self.store
            .insert_instructions(&LlmInstructions {
                instructions: text.to_string(),
                updated_at: Utc::now(),
            })
            .await?;
        let invalidated = self.store.delete_all_cached_reports().await?;
        tracing::info!(invalidated, "LLM instructions updated; cached reports cleared");
        Ok(invalidated)
    }
}
