//! Error taxonomy for orchestrator operations.
//!
//! | Variant | Meaning | HTTP |
//! |---------|---------|------|
//! | `Validation` | Malformed request body or path parameter | 400 |
//! | `NotFound` | Referenced address does not exist | 404 |
//! | `Upstream` | LLM unreachable, empty, or unparseable | 500 |
//! | `Instructions` | Instructions lookup failed during generation | 500 |
//! | `MissingDetails` | Primary address has no extracted details | 500 |
//! | `Store` | Database failure | 500 |
//!
//! Nothing is retried. "No primary" and "no comparisons" are not errors.

use bma_core::llm::LlmError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BmaError>;

#[derive(Debug, Error)]
pub enum BmaError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] LlmError),

    #[error("error fetching LLM instructions: {0}")]
    Instructions(anyhow::Error),

    #[error("no property details for primary address {address}")]
    MissingDetails { address: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl BmaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
