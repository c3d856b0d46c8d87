//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Unique constraints
//! (address string, raw page address, cache key) are enforced the same way
//! the SQLite schema enforces them.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Address, CachedBmaReport, LlmInstructions, RawPageData};
use crate::report::CacheKey;

use super::{Store, UpsertOutcome};

/// In-memory store.
pub struct InMemoryStore {
    raw_pages: RwLock<Vec<RawPageData>>,
    addresses: RwLock<Vec<Address>>,
    reports: RwLock<HashMap<CacheKey, CachedBmaReport>>,
    instructions: RwLock<Vec<LlmInstructions>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            raw_pages: RwLock::new(Vec::new()),
            addresses: RwLock::new(Vec::new()),
            reports: RwLock::new(HashMap::new()),
            instructions: RwLock::new(Vec::new()),
        }
    }

    /// Number of cached reports currently held.
    pub fn cached_report_count(&self) -> usize {
        self.reports.read().unwrap().len()
    }

    /// Number of raw pages currently held.
    pub fn raw_page_count(&self) -> usize {
        self.raw_pages.read().unwrap().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page_address(page: &RawPageData) -> Option<&str> {
    page.property_details.as_ref().map(|d| d.address.as_str())
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_raw_page(&self, page: &RawPageData) -> Result<UpsertOutcome> {
        let address = page_address(page)
            .ok_or_else(|| anyhow!("raw page has no property details to key on"))?;
        let mut pages = self.raw_pages.write().unwrap();

        if let Some(existing) = pages
            .iter_mut()
            .find(|p| page_address(p) == Some(address))
        {
            existing.url = page.url.clone();
            existing.content = page.content.clone();
            existing.property_details = page.property_details.clone();
            return Ok(UpsertOutcome {
                id: existing.id.clone(),
                inserted: false,
            });
        }

        let id = Uuid::new_v4().to_string();
        pages.push(RawPageData {
            id: id.clone(),
            ..page.clone()
        });
        Ok(UpsertOutcome { id, inserted: true })
    }

    async fn get_raw_page(&self, id: &str) -> Result<Option<RawPageData>> {
        let pages = self.raw_pages.read().unwrap();
        Ok(pages.iter().find(|p| p.id == id).cloned())
    }

    async fn delete_raw_page(&self, id: &str) -> Result<bool> {
        let mut pages = self.raw_pages.write().unwrap();
        let before = pages.len();
        pages.retain(|p| p.id != id);
        Ok(pages.len() != before)
    }

    async fn insert_address(&self, address: &Address) -> Result<String> {
        let mut addresses = self.addresses.write().unwrap();
        if addresses
            .iter()
            .any(|a| a.address_str == address.address_str)
        {
            bail!("address already exists: {}", address.address_str);
        }
        let id = if address.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            address.id.clone()
        };
        addresses.push(Address {
            id: id.clone(),
            ..address.clone()
        });
        Ok(id)
    }

    async fn get_address(&self, id: &str) -> Result<Option<Address>> {
        let addresses = self.addresses.read().unwrap();
        Ok(addresses.iter().find(|a| a.id == id).cloned())
    }

    async fn find_address_by_str(&self, address_str: &str) -> Result<Option<Address>> {
        let addresses = self.addresses.read().unwrap();
        Ok(addresses
            .iter()
            .find(|a| a.address_str == address_str)
            .cloned())
    }

    async fn list_addresses(&self) -> Result<Vec<Address>> {
        Ok(self.addresses.read().unwrap().clone())
    }

    async fn find_primary_address(&self) -> Result<Option<Address>> {
        let addresses = self.addresses.read().unwrap();
        Ok(addresses.iter().find(|a| a.primary).cloned())
    }

    async fn find_comparison_addresses(&self) -> Result<Vec<Address>> {
        let addresses = self.addresses.read().unwrap();
        Ok(addresses
            .iter()
            .filter(|a| a.enabled && !a.primary)
            .cloned()
            .collect())
    }

    async fn clear_primary_flags(&self) -> Result<u64> {
        let mut addresses = self.addresses.write().unwrap();
        let mut cleared = 0;
        for a in addresses.iter_mut().filter(|a| a.primary) {
            a.primary = false;
            cleared += 1;
        }
        Ok(cleared)
    }

    async fn set_address_flags(&self, id: &str, enabled: bool, primary: bool) -> Result<bool> {
        let mut addresses = self.addresses.write().unwrap();
        match addresses.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.enabled = enabled;
                a.primary = primary;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn link_raw_page(&self, id: &str, raw_page_id: &str) -> Result<bool> {
        let mut addresses = self.addresses.write().unwrap();
        match addresses.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.raw_page_id = Some(raw_page_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_address(&self, id: &str) -> Result<bool> {
        let mut addresses = self.addresses.write().unwrap();
        let before = addresses.len();
        addresses.retain(|a| a.id != id);
        Ok(addresses.len() != before)
    }

    async fn get_cached_report(&self, key: &CacheKey) -> Result<Option<CachedBmaReport>> {
        Ok(self.reports.read().unwrap().get(key).cloned())
    }

    async fn upsert_cached_report(&self, report: &CachedBmaReport) -> Result<()> {
        self.reports
            .write()
            .unwrap()
            .insert(report.key(), report.clone());
        Ok(())
    }

    async fn delete_cached_report(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.reports.write().unwrap().remove(key).is_some())
    }

    async fn delete_all_cached_reports(&self) -> Result<u64> {
        let mut reports = self.reports.write().unwrap();
        let n = reports.len() as u64;
        reports.clear();
        Ok(n)
    }

    async fn get_instructions(&self) -> Result<Option<LlmInstructions>> {
        Ok(self.instructions.read().unwrap().first().cloned())
    }

    async fn insert_instructions(&self, instructions: &LlmInstructions) -> Result<()> {
        self.instructions
            .write()
            .unwrap()
            .push(instructions.clone());
        Ok(())
    }

    async fn delete_all_instructions(&self) -> Result<u64> {
        let mut docs = self.instructions.write().unwrap();
        let n = docs.len() as u64;
        docs.clear();
        Ok(n)
    }
}
