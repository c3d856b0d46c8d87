//! Report cache rules.
//!
//! A cached report is identified by the primary address ID and the *set*
//! of enabled comparison IDs. [`CacheKey`] sorts the comparison IDs on
//! construction so the same set always yields the same key regardless of
//! the order the store returned the addresses in.

use chrono::{DateTime, Duration, Utc};

/// Opinion returned when no address is marked primary.
pub const NO_PRIMARY_OPINION: &str = "No primary address set yet.";

/// Opinion returned when a primary exists but nothing is enabled to compare against.
pub const NO_COMPARISONS_OPINION: &str = "Need at least one enabled comparison address.";

/// Default freshness window for cached reports.
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;

/// Identity of one cached report: `(primary ID, sorted comparison IDs)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    primary_id: String,
    comparison_ids: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(primary_id: impl Into<String>, comparison_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut comparison_ids: Vec<String> = comparison_ids.into_iter().map(Into::into).collect();
        comparison_ids.sort();
        Self {
            primary_id: primary_id.into(),
            comparison_ids,
        }
    }

    pub fn primary_id(&self) -> &str {
        &self.primary_id
    }

    pub fn comparison_ids(&self) -> &[String] {
        &self.comparison_ids
    }

    /// The sorted comparison IDs as a JSON array, as stored in the
    /// `comparison_address_ids` column.
    pub fn comparison_ids_json(&self) -> String {
        serde_json::to_string(&self.comparison_ids).unwrap_or_else(|_| "[]".to_string())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:[{}]", self.primary_id, self.comparison_ids.join(","))
    }
}

/// Whether a report generated at `generated_at` may still be served at `now`.
///
/// The window is half-open: a report exactly `ttl` old is stale.
pub fn is_fresh(generated_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - generated_at < ttl
}
