//! # BMA Core
//!
//! Shared logic for the BMA (Broker Market Analysis) calculator: data
//! models, the store abstraction, the LLM completion trait, prompt
//! construction, reply parsing, and the report cache rules.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Backends (SQLite, the Gemini client) live in the `bma-calculator` crate.

pub mod llm;
pub mod models;
pub mod prompt;
pub mod reply;
pub mod report;
pub mod store;
