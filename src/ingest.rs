//! Listing ingestion.
//!
//! Flow: extension page → extraction → raw page upsert (keyed by the
//! extracted address) → address record. Extraction runs before any write,
//! so a failed extraction leaves the store untouched.
//!
//! An address record with the same string may already exist without a raw
//! page (created by hand, or left by an earlier failed ingest). It is linked
//! to the page instead of duplicated; its flags are kept.

use bma_core::llm::LlmError;
use bma_core::models::{Address, RawPageData};

use crate::error::{BmaError, Result};
use crate::service::BmaService;

/// What an ingestion did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// The address the model extracted.
    pub address: String,
    pub raw_page_id: String,
    /// `true` if no raw page existed for this address, `false` if an
    /// existing raw page was replaced.
    pub upserted: bool,
}

impl BmaService {
    /// Ingest one listing page.
    ///
    /// New addresses start disabled and non-primary.
    pub async fn ingest(&self, url: &str, content: &str) -> Result<IngestOutcome> {
        if content.trim().is_empty() {
            return Err(BmaError::validation("content must not be empty"));
        }

        tracing::info!(url, "Received page data");

        let details = self.extractor.extract(content).await?;
        if details.address.trim().is_empty() {
            return Err(
                LlmError::MalformedJson("extracted details have no address".to_string()).into(),
            );
        }
        let address = details.address.clone();
        tracing::info!(address = %address, "Extracted property details");

        let page = RawPageData {
            id: String::new(),
            url: url.to_string(),
            content: content.to_string(),
            property_details: Some(details),
        };
        let outcome = self.store.upsert_raw_page(&page).await?;

        match self.store.find_address_by_str(&address).await? {
            None => {
                self.store
                    .insert_address(&Address {
                        id: String::new(),
                        raw_page_id: Some(outcome.id.clone()),
                        address_str: address.clone(),
                        enabled: false,
                        primary: false,
                    })
                    .await?;
                tracing::info!(address = %address, "Created new address record");
            }
            Some(existing) if existing.raw_page_id.as_deref() != Some(outcome.id.as_str()) => {
                self.store.link_raw_page(&existing.id, &outcome.id).await?;
                tracing::info!(address = %address, "Linked existing address to raw page");
            }
            Some(_) => {
                tracing::info!(address = %address, "Updated existing address record");
            }
        }

        Ok(IngestOutcome {
            address,
            raw_page_id: outcome.id,
            upserted: outcome.inserted,
        })
    }
}
