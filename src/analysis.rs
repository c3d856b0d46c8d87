//! Detailed analysis generator.
//!
//! Builds the BMA prompt from the primary property, the comparison
//! properties, and the operator's current instructions, then parses the
//! model's reply into a [`DetailedAnalysis`].
//!
//! The model is trusted for the analysis text only: the property details
//! it echoes back are replaced with the ones that were sent.

use std::sync::Arc;

use bma_core::llm::{CompletionClient, LlmError};
use bma_core::models::{DetailedAnalysis, PropertyDetails};
use bma_core::prompt::analysis_prompt;
use bma_core::reply::parse_reply;
use bma_core::store::Store;

use crate::error::{BmaError, Result};

pub struct AnalysisGenerator {
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn Store>,
    model: String,
}

impl AnalysisGenerator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Arc<dyn Store>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            model: model.into(),
        }
    }

    /// Generate the analysis.
    ///
    /// Instructions are read fresh from the store; none stored means an
    /// empty instructions section.
    pub async fn generate(
        &self,
        primary: &PropertyDetails,
        comparisons: &[PropertyDetails],
    ) -> Result<DetailedAnalysis> {
        let instructions = self
            .store
            .get_instructions()
            .await
            .map_err(BmaError::Instructions)?
            .map(|i| i.instructions)
            .unwrap_or_default();

        let prompt = analysis_prompt(primary, comparisons, &instructions);
        let reply = self.client.complete(&self.model, &prompt).await?;
        if reply.trim().is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }

        let mut analysis: DetailedAnalysis = parse_reply(&reply)?;
        analysis.primary_property_details = primary.clone();
        analysis.comparison_details = comparisons.to_vec();
        Ok(analysis)
    }
}
