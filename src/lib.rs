//! # BMA Calculator
//!
//! Backend for Broker Market Analysis reports. A browser extension posts
//! real-estate listing pages; an LLM extracts structured property details;
//! the frontend marks one address as primary and enables comparisons; the
//! service produces (and caches) a detailed comparison report.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  page   ┌────────────┐  upsert  ┌────────────┐
//! │ Extension │────────▶│ Extraction │─────────▶│   SQLite   │
//! └───────────┘         └────────────┘          │   Store    │
//!                                               └─────┬──────┘
//!                                                     │
//! ┌───────────┐ report  ┌────────────┐   read/cache   │
//! │ Frontend  │────────▶│ BmaService │◀───────────────┘
//! └───────────┘         └─────┬──────┘
//!                             │ cache miss
//!                             ▼
//!                       ┌────────────┐
//!                       │  Analysis  │ (Gemini)
//!                       └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, defaults, env overrides |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Idempotent schema and unique indexes |
//! | [`sqlite_store`] | SQLite implementation of [`bma_core::store::Store`] |
//! | [`gemini`] | Gemini `generateContent` client |
//! | [`extraction`] | Listing text → `PropertyDetails` |
//! | [`analysis`] | Primary + comparisons → `DetailedAnalysis` |
//! | [`service`] | The orchestrator, [`service::BmaService`] |
//! | [`ingest`] | Page ingestion |
//! | [`addresses`] | Address listing, creation, flags, deletion |
//! | [`report`] | Report generation with cache-aside |
//! | [`instructions`] | Prompt instructions and global cache invalidation |
//! | [`server`] | Axum HTTP API with CORS |
//! | [`error`] | Error taxonomy |

pub mod addresses;
pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod gemini;
pub mod ingest;
pub mod instructions;
pub mod migrate;
pub mod report;
pub mod server;
pub mod service;
pub mod sqlite_store;

pub use bma_core::{models, store};
pub use error::BmaError;
pub use service::BmaService;
