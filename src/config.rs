//! Configuration parsing and validation.
//!
//! The calculator is configured from a TOML file (default
//! `config/bma.toml`). Every section and field has a default, so an empty
//! file, or no file at all, yields a working local setup:
//!
//! ```toml
//! [db]
//! path = "./data/bma.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! allowed_origin = "http://localhost:3000"
//!
//! [llm]
//! extraction_model = "gemini-1.5-flash"
//! analysis_model = "gemini-1.5-pro"
//! api_key_env = "GEMINI_API_KEY"
//! # timeout_secs = 120
//!
//! [report]
//! cache_ttl_hours = 24
//! ```
//!
//! Environment overrides: `BMA_DATABASE_PATH` replaces `db.path`,
//! `BMA_BIND` replaces `server.bind`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use bma_core::report::DEFAULT_CACHE_TTL_HOURS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/bma.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// The only origin allowed by the CORS policy (the frontend).
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    /// Name of the environment variable holding the API key. Read on every
    /// call, so a missing key fails the call rather than startup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Client-side request timeout. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extraction_model: default_extraction_model(),
            analysis_model: default_analysis_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_extraction_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_analysis_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: default_cache_ttl_hours(),
        }
    }
}

fn default_cache_ttl_hours() -> i64 {
    DEFAULT_CACHE_TTL_HOURS
}

impl ReportConfig {
    /// Report freshness window. Saturates at the largest representable
    /// duration; `validate` rejects such values before this is reached.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.cache_ttl_hours).unwrap_or(chrono::Duration::MAX)
    }
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults, then apply
/// environment overrides.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(path) = std::env::var("BMA_DATABASE_PATH") {
        config.db.path = PathBuf::from(path);
    }
    if let Ok(bind) = std::env::var("BMA_BIND") {
        config.server.bind = bind;
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.report.cache_ttl_hours <= 0 {
        anyhow::bail!("report.cache_ttl_hours must be > 0");
    }
    if chrono::Duration::try_hours(config.report.cache_ttl_hours).is_none() {
        anyhow::bail!(
            "report.cache_ttl_hours is out of range: {}",
            config.report.cache_ttl_hours
        );
    }
    if config.llm.extraction_model.trim().is_empty() || config.llm.analysis_model.trim().is_empty()
    {
        anyhow::bail!("llm.extraction_model and llm.analysis_model must not be empty");
    }
    if config.llm.timeout_secs == Some(0) {
        anyhow::bail!("llm.timeout_secs must be > 0 when set");
    }
    if config.server.allowed_origin.parse::<axum::http::HeaderValue>().is_err() {
        anyhow::bail!(
            "server.allowed_origin is not a valid origin: '{}'",
            config.server.allowed_origin
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.db.path, PathBuf::from("./data/bma.sqlite"));
        assert_eq!(config.server.allowed_origin, "http://localhost:3000");
        assert_eq!(config.llm.extraction_model, "gemini-1.5-flash");
        assert_eq!(config.llm.analysis_model, "gemini-1.5-pro");
        assert_eq!(config.llm.timeout_secs, None);
        assert_eq!(config.report.cache_ttl_hours, 24);
        validate(&config).unwrap();
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [db]
            path = "/tmp/x.sqlite"

            [llm]
            timeout_secs = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.llm.timeout_secs, Some(90));
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let config = parse_config("[report]\ncache_ttl_hours = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_ttl() {
        let config = parse_config("[report]\ncache_ttl_hours = 9000000000000\n").unwrap();
        assert!(validate(&config).is_err());
        assert_eq!(config.report.cache_ttl(), chrono::Duration::MAX);
    }

    #[test]
    fn test_ttl_hours_to_duration() {
        let config = parse_config("[report]\ncache_ttl_hours = 6\n").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.report.cache_ttl(), chrono::Duration::hours(6));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = parse_config("[llm]\ntimeout_secs = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.report.cache_ttl_hours, 24);
    }
}
