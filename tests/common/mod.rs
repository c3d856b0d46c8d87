//! Shared fixtures: a scripted completion client, a store wrapper that can
//! fail chosen methods, and a service wired to both.

#![allow(dead_code)]

use anyhow::bail;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bma_calculator::config::Config;
use bma_calculator::BmaService;
use bma_core::llm::{CompletionClient, LlmError};
use bma_core::models::{Address, CachedBmaReport, LlmInstructions, RawPageData};
use bma_core::report::CacheKey;
use bma_core::store::memory::InMemoryStore;
use bma_core::store::{Store, UpsertOutcome};

pub const EXTRACTION_MODEL: &str = "gemini-1.5-flash";

/// Answers extraction prompts from a table of `(listing needle, reply)`
/// pairs and analysis prompts with a single configurable reply.
pub struct ScriptedClient {
    listings: Mutex<Vec<(String, String)>>,
    analysis_reply: Mutex<Result<String, LlmError>>,
    extraction_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
    last_analysis_prompt: Mutex<Option<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            listings: Mutex::new(Vec::new()),
            analysis_reply: Mutex::new(Ok(analysis_json("Comparable value."))),
            extraction_calls: AtomicUsize::new(0),
            analysis_calls: AtomicUsize::new(0),
            last_analysis_prompt: Mutex::new(None),
        }
    }

    /// Reply to any extraction prompt containing `needle` with the
    /// property JSON for `address`.
    pub fn listing(&self, needle: &str, address: &str, price: f64) {
        self.listing_reply(needle, &property_json(address, price));
    }

    pub fn listing_reply(&self, needle: &str, reply: &str) {
        self.listings
            .lock()
            .unwrap()
            .push((needle.to_string(), reply.to_string()));
    }

    pub fn set_analysis_reply(&self, reply: Result<String, LlmError>) {
        *self.analysis_reply.lock().unwrap() = reply;
    }

    pub fn extraction_calls(&self) -> usize {
        self.extraction_calls.load(Ordering::SeqCst)
    }

    pub fn analysis_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    pub fn last_analysis_prompt(&self) -> Option<String> {
        self.last_analysis_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        if model == EXTRACTION_MODEL {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            let listings = self.listings.lock().unwrap();
            return listings
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, reply)| reply.clone())
                .ok_or_else(|| LlmError::Unreachable("no scripted listing".to_string()));
        }

        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_analysis_prompt.lock().unwrap() = Some(prompt.to_string());
        match &*self.analysis_reply.lock().unwrap() {
            Ok(reply) => Ok(reply.clone()),
            Err(e) => Err(clone_llm_error(e)),
        }
    }
}

fn clone_llm_error(e: &LlmError) -> LlmError {
    match e {
        LlmError::Unreachable(m) => LlmError::Unreachable(m.clone()),
        LlmError::Provider { status, message } => LlmError::Provider {
            status: *status,
            message: message.clone(),
        },
        LlmError::EmptyResponse => LlmError::EmptyResponse,
        LlmError::MalformedJson(m) => LlmError::MalformedJson(m.clone()),
    }
}

pub fn property_json(address: &str, price: f64) -> String {
    serde_json::json!({
        "address": address,
        "price": price,
        "bedrooms": 3,
        "bathrooms": 2.5,
        "squareFootage": 1800,
        "yearBuilt": 1995,
        "propertyType": "Single Family",
        "lotSize": "0.25 acres",
        "mlsNumber": "MLS-1",
        "daysOnMarket": 12,
        "lastPriceChange": -5000,
        "description": "Updated kitchen."
    })
    .to_string()
}

pub fn analysis_json(recommendation: &str) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "primaryPropertyDetails": {},
            "comparisonDetails": [],
            "priceAnalysis": "Priced in line with comparables.",
            "featureComparison": [
                {
                    "feature": "Bedrooms",
                    "primaryValue": 3,
                    "comparison": [{ "address": "2 Oak Ave", "value": 4 }],
                    "analysis": "One fewer bedroom."
                }
            ],
            "marketTrends": "Stable.",
            "recommendation": recommendation
        })
    )
}

/// Delegates to an [`InMemoryStore`]; methods named in `failing` return
/// an error instead.
pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FlakyStore {
    fn check(&self, method: &'static str) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(method) {
            bail!("{} failed", method);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn upsert_raw_page(&self, page: &RawPageData) -> anyhow::Result<UpsertOutcome> {
        self.check("upsert_raw_page")?;
        self.inner.upsert_raw_page(page).await
    }
    async fn get_raw_page(&self, id: &str) -> anyhow::Result<Option<RawPageData>> {
        self.check("get_raw_page")?;
        self.inner.get_raw_page(id).await
    }
    async fn delete_raw_page(&self, id: &str) -> anyhow::Result<bool> {
        self.check("delete_raw_page")?;
        self.inner.delete_raw_page(id).await
    }
    async fn insert_address(&self, address: &Address) -> anyhow::Result<String> {
        self.check("insert_address")?;
        self.inner.insert_address(address).await
    }
    async fn get_address(&self, id: &str) -> anyhow::Result<Option<Address>> {
        self.check("get_address")?;
        self.inner.get_address(id).await
    }
    async fn find_address_by_str(&self, address_str: &str) -> anyhow::Result<Option<Address>> {
        self.check("find_address_by_str")?;
        self.inner.find_address_by_str(address_str).await
    }
    async fn list_addresses(&self) -> anyhow::Result<Vec<Address>> {
        self.check("list_addresses")?;
        self.inner.list_addresses().await
    }
    async fn find_primary_address(&self) -> anyhow::Result<Option<Address>> {
        self.check("find_primary_address")?;
        self.inner.find_primary_address().await
    }
    async fn find_comparison_addresses(&self) -> anyhow::Result<Vec<Address>> {
        self.check("find_comparison_addresses")?;
        self.inner.find_comparison_addresses().await
    }
    async fn clear_primary_flags(&self) -> anyhow::Result<u64> {
        self.check("clear_primary_flags")?;
        self.inner.clear_primary_flags().await
    }
    async fn set_address_flags(
        &self,
        id: &str,
        enabled: bool,
        primary: bool,
    ) -> anyhow::Result<bool> {
        self.check("set_address_flags")?;
        self.inner.set_address_flags(id, enabled, primary).await
    }
    async fn link_raw_page(&self, id: &str, raw_page_id: &str) -> anyhow::Result<bool> {
        self.check("link_raw_page")?;
        self.inner.link_raw_page(id, raw_page_id).await
    }
    async fn delete_address(&self, id: &str) -> anyhow::Result<bool> {
        self.check("delete_address")?;
        self.inner.delete_address(id).await
    }
    async fn get_cached_report(
        &self,
        key: &CacheKey,
    ) -> anyhow::Result<Option<CachedBmaReport>> {
        self.check("get_cached_report")?;
        self.inner.get_cached_report(key).await
    }
    async fn upsert_cached_report(&self, report: &CachedBmaReport) -> anyhow::Result<()> {
        self.check("upsert_cached_report")?;
        self.inner.upsert_cached_report(report).await
    }
    async fn delete_cached_report(&self, key: &CacheKey) -> anyhow::Result<bool> {
        self.check("delete_cached_report")?;
        self.inner.delete_cached_report(key).await
    }
    async fn delete_all_cached_reports(&self) -> anyhow::Result<u64> {
        self.check("delete_all_cached_reports")?;
        self.inner.delete_all_cached_reports().await
    }
    async fn get_instructions(&self) -> anyhow::Result<Option<LlmInstructions>> {
        self.check("get_instructions")?;
        self.inner.get_instructions().await
    }
    async fn insert_instructions(&self, instructions: &LlmInstructions) -> anyhow::Result<()> {
        self.check("insert_instructions")?;
        self.inner.insert_instructions(instructions).await
    }
    async fn delete_all_instructions(&self) -> anyhow::Result<u64> {
        self.check("delete_all_instructions")?;
        self.inner.delete_all_instructions().await
    }
}

pub struct Harness {
    pub service: Arc<BmaService>,
    /// The backing store, read directly by assertions; never fails.
    pub store: Arc<InMemoryStore>,
    pub client: Arc<ScriptedClient>,
    flaky: Arc<FlakyStore>,
}

pub fn harness() -> Harness {
    harness_with(|s| s)
}

pub fn harness_with(configure: impl FnOnce(BmaService) -> BmaService) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let flaky = Arc::new(FlakyStore {
        inner: store.clone(),
        failing: Mutex::new(HashSet::new()),
    });
    let client = Arc::new(ScriptedClient::new());
    let service = BmaService::new(flaky.clone(), client.clone(), &Config::default());
    Harness {
        service: Arc::new(configure(service)),
        store,
        client,
        flaky,
    }
}

impl Harness {
    /// Make the service's calls to `method` fail from now on.
    pub fn fail(&self, method: &'static str) {
        self.flaky.failing.lock().unwrap().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.flaky.failing.lock().unwrap().remove(method);
    }

    /// Ingest a scripted listing and return the new address ID.
    pub async fn add_listing(&self, needle: &str, address: &str, price: f64) -> String {
        self.client.listing(needle, address, price);
        let outcome = self
            .service
            .ingest("https://listings.example/x", &format!("Listing page: {}", needle))
            .await
            .unwrap();
        assert!(outcome.upserted);
        self.address_id(address).await
    }

    pub async fn address_id(&self, address: &str) -> String {
        self.service
            .list_addresses()
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.address_str == address)
            .map(|a| a.id)
            .unwrap_or_else(|| panic!("address {} not listed", address))
    }
}
