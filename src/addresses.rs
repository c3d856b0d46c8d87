//! Address management: listing, manual creation, flag updates, deletion.
//!
//! # Primary uniqueness
//!
//! Setting `primary = true` is two unguarded writes: clear the flag on
//! every address, then set it on the target. Two concurrent requests can
//! interleave so that zero or two addresses end up primary. A single
//! conditional update inside a transaction would close the window.

use serde::Deserialize;
use uuid::Uuid;

use bma_core::models::{Address, AddressWithDetails};

use crate::error::{BmaError, Result};
use crate::service::BmaService;

/// Requested flag state for `PATCH /api/addresses/{id}`.
///
/// Both flags are always written; an absent field means `false`, not
/// "leave unchanged".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AddressFlags {
    pub enabled: bool,
    pub primary: bool,
}

/// Body of `POST /api/addresses`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewAddress {
    pub address_str: String,
    pub raw_page_id: Option<String>,
    pub enabled: bool,
    pub primary: bool,
}

/// Validate an address ID from a path parameter.
pub fn parse_address_id(id: &str) -> Result<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| BmaError::validation("Invalid address ID"))
}

impl BmaService {
    /// All addresses, each joined with a summary of its extracted details.
    pub async fn list_addresses(&self) -> Result<Vec<AddressWithDetails>> {
        let addresses = self.store.list_addresses().await?;
        let mut out = Vec::with_capacity(addresses.len());
        for address in &addresses {
            let page = match &address.raw_page_id {
                Some(id) => self.store.get_raw_page(id).await?,
                None => None,
            };
            let details = page.as_ref().and_then(|p| p.property_details.as_ref());
            out.push(AddressWithDetails::new(address, details));
        }
        Ok(out)
    }

    /// Create an address by hand (no raw page is required).
    pub async fn create_address(&self, new: NewAddress) -> Result<String> {
        let address_str = new.address_str.trim();
        if address_str.is_empty() {
            return Err(BmaError::validation("addressStr must not be empty"));
        }
        if new.primary {
            self.store.clear_primary_flags().await?;
        }
        let id = self
            .store
            .insert_address(&Address {
                id: String::new(),
                raw_page_id: new.raw_page_id,
                address_str: address_str.to_string(),
                enabled: new.enabled,
                primary: new.primary,
            })
            .await?;
        tracing::info!(address = %address_str, id = %id, "Address created");
        Ok(id)
    }

    /// Overwrite both flags of one address.
    ///
    /// An unknown ID is not an error; nothing is updated.
    pub async fn update_address(&self, id: &str, flags: AddressFlags) -> Result<()> {
        let id = parse_address_id(id)?;

        if flags.primary {
            let cleared = self.store.clear_primary_flags().await?;
            tracing::debug!(cleared, "Cleared existing primary flags");
        }

        let matched = self
            .store
            .set_address_flags(&id, flags.enabled, flags.primary)
            .await?;
        if matched {
            tracing::info!(id = %id, enabled = flags.enabled, primary = flags.primary, "Address updated");
        } else {
            tracing::warn!(id = %id, "Address update matched no record");
        }
        Ok(())
    }

    /// Delete an address and, best-effort, its raw page.
    pub async fn delete_address(&self, id: &str) -> Result<()> {
        let id = parse_address_id(id)?;

        let address = self
            .store
            .get_address(&id)
            .await?
            .ok_or_else(|| BmaError::not_found("Address not found"))?;

        self.store.delete_address(&id).await?;

        if let Some(raw_id) = &address.raw_page_id {
            if !self.store.delete_raw_page(raw_id).await? {
                tracing::debug!(raw_page_id = %raw_id, "Raw page already gone");
            }
        }

        tracing::info!(address = %address.address_str, "Address deleted");
        Ok(())
    }
}
