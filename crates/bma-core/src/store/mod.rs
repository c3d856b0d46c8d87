//! Storage abstraction for the BMA calculator.
//!
//! The [`Store`] trait exposes collection-scoped CRUD over the four
//! persisted collections (raw pages, addresses, cached reports, LLM
//! instructions). Rules that span records, such as primary uniqueness and
//! cascading deletes, belong to the orchestrator.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Address, CachedBmaReport, LlmInstructions, RawPageData};
use crate::report::CacheKey;

/// Result of an upsert keyed by a unique field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// ID of the inserted or matched record.
    pub id: String,
    /// `true` when no record matched and a new one was created.
    pub inserted: bool,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Collection | Purpose |
/// |--------|------------|---------|
/// | [`upsert_raw_page`](Store::upsert_raw_page) | raw pages | Insert or replace by extracted address |
/// | [`get_raw_page`](Store::get_raw_page) | raw pages | Fetch by ID |
/// | [`delete_raw_page`](Store::delete_raw_page) | raw pages | Delete by ID |
/// | [`insert_address`](Store::insert_address) | addresses | Insert (unique address string) |
/// | [`get_address`](Store::get_address) | addresses | Fetch by ID |
/// | [`find_address_by_str`](Store::find_address_by_str) | addresses | Fetch by address string |
/// | [`list_addresses`](Store::list_addresses) | addresses | All, in insertion order |
/// | [`find_primary_address`](Store::find_primary_address) | addresses | The `primary = true` record |
/// | [`find_comparison_addresses`](Store::find_comparison_addresses) | addresses | `enabled = true, primary = false` |
/// | [`clear_primary_flags`](Store::clear_primary_flags) | addresses | Set `primary = false` everywhere |
/// | [`set_address_flags`](Store::set_address_flags) | addresses | Overwrite both flags of one record |
/// | [`link_raw_page`](Store::link_raw_page) | addresses | Point one record at a raw page |
/// | [`delete_address`](Store::delete_address) | addresses | Delete by ID |
/// | [`get_cached_report`](Store::get_cached_report) | cached reports | Fetch by [`CacheKey`] |
/// | [`upsert_cached_report`](Store::upsert_cached_report) | cached reports | Insert or replace by [`CacheKey`] |
/// | [`delete_cached_report`](Store::delete_cached_report) | cached reports | Delete by [`CacheKey`] |
/// | [`delete_all_cached_reports`](Store::delete_all_cached_reports) | cached reports | Delete every entry |
/// | [`get_instructions`](Store::get_instructions) | instructions | Any one document |
/// | [`insert_instructions`](Store::insert_instructions) | instructions | Add a document |
/// | [`delete_all_instructions`](Store::delete_all_instructions) | instructions | Delete every document |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace the raw page whose `property_details.address`
    /// matches. On a match, url, content, and details are all replaced and
    /// the existing ID is kept.
    ///
    /// Fails if the page carries no property details.
    async fn upsert_raw_page(&self, page: &RawPageData) -> Result<UpsertOutcome>;

    async fn get_raw_page(&self, id: &str) -> Result<Option<RawPageData>>;

    /// Returns `false` if no page had this ID.
    async fn delete_raw_page(&self, id: &str) -> Result<bool>;

    /// Insert a new address, assigning an ID if `address.id` is empty.
    ///
    /// Fails if another address has the same `address_str`.
    async fn insert_address(&self, address: &Address) -> Result<String>;

    async fn get_address(&self, id: &str) -> Result<Option<Address>>;

    async fn find_address_by_str(&self, address_str: &str) -> Result<Option<Address>>;

    async fn list_addresses(&self) -> Result<Vec<Address>>;

    async fn find_primary_address(&self) -> Result<Option<Address>>;

    async fn find_comparison_addresses(&self) -> Result<Vec<Address>>;

    /// Returns the number of addresses that were primary.
    async fn clear_primary_flags(&self) -> Result<u64>;

    /// Returns `false` if no address had this ID.
    async fn set_address_flags(&self, id: &str, enabled: bool, primary: bool) -> Result<bool>;

    /// Set `raw_page_id` on one address. Returns `false` if no address had
    /// this ID.
    async fn link_raw_page(&self, id: &str, raw_page_id: &str) -> Result<bool>;

    /// Returns `false` if no address had this ID.
    async fn delete_address(&self, id: &str) -> Result<bool>;

    async fn get_cached_report(&self, key: &CacheKey) -> Result<Option<CachedBmaReport>>;

    /// Insert or replace the entry for `report.key()`. The latest write wins.
    async fn upsert_cached_report(&self, report: &CachedBmaReport) -> Result<()>;

    /// Returns `false` if there was no entry for `key`.
    async fn delete_cached_report(&self, key: &CacheKey) -> Result<bool>;

    /// Returns the number of entries removed.
    async fn delete_all_cached_reports(&self) -> Result<u64>;

    async fn get_instructions(&self) -> Result<Option<LlmInstructions>>;

    async fn insert_instructions(&self, instructions: &LlmInstructions) -> Result<()>;

    /// Returns the number of documents removed.
    async fn delete_all_instructions(&self) -> Result<u64>;
}
