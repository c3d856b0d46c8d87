//! The address/report orchestrator.
//!
//! [`BmaService`] owns the store and both LLM-backed components and is the
//! single entry point used by the HTTP layer and the CLI. Its operations
//! are split by concern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`crate::ingest`] | `ingest` |
//! | [`crate::addresses`] | `list_addresses`, `create_address`, `update_address`, `delete_address` |
//! | [`crate::report`] | `get_report` |
//! | [`crate::instructions`] | `get_instructions`, `update_instructions` |
//!
//! The service holds no locks and no in-process state beyond its handles:
//! all shared state lives in the store.

use std::sync::Arc;

use bma_core::llm::CompletionClient;
use bma_core::store::Store;

use crate::analysis::AnalysisGenerator;
use crate::config::Config;
use crate::db;
use crate::extraction::PropertyExtractor;
use crate::gemini::GeminiClient;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct BmaService {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) extractor: PropertyExtractor,
    pub(crate) generator: AnalysisGenerator,
    pub(crate) cache_ttl: chrono::Duration,
}

impl BmaService {
    /// Wire a service from an explicit store and completion client.
    pub fn new(store: Arc<dyn Store>, client: Arc<dyn CompletionClient>, config: &Config) -> Self {
        Self {
            extractor: PropertyExtractor::new(client.clone(), &config.llm.extraction_model),
            generator: AnalysisGenerator::new(
                client,
                store.clone(),
                &config.llm.analysis_model,
            ),
            store,
            cache_ttl: config.report.cache_ttl(),
        }
    }

    /// Open the configured SQLite database (running migrations) and wire
    /// it to the Gemini client.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
        let client: Arc<dyn CompletionClient> = Arc::new(GeminiClient::new(&config.llm)?);
        Ok(Self::new(store, client, config))
    }

    /// Override the report freshness window.
    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn extractor(&self) -> &PropertyExtractor {
        &self.extractor
    }
}
