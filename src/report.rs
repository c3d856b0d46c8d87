//! BMA report generation with cache-aside.
//!
//! ```text
//! NO_PRIMARY ─▶ NO_COMPARISONS ─▶ CACHE_HIT
//!                              └▶ CACHE_MISS ─▶ GENERATING ─▶ CACHED
//! ```
//!
//! The first two states are normal outcomes, reported with an explanatory
//! opinion. Only generation can fail the request.
//!
//! Failures that do not stop a report from being produced are collected as
//! [`SoftFailure`]s on the [`ReportOutcome`] and logged at `warn`.

use chrono::Utc;

use bma_core::models::{Address, BmaReport, CachedBmaReport, PropertyDetails};
use bma_core::report::{is_fresh, CacheKey, NO_COMPARISONS_OPINION, NO_PRIMARY_OPINION};

use crate::error::{BmaError, Result};
use crate::service::BmaService;

/// Where the returned report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    /// No primary address, or no enabled comparisons; no analysis attempted.
    Unavailable,
    /// Served from a fresh cache entry without calling the LLM.
    Cached,
    /// Generated by the LLM on this request.
    Generated,
}

/// A non-fatal problem encountered while producing a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailure {
    /// Reading the cache failed; treated as a miss.
    CacheRead { key: String, message: String },
    /// Removing the entry before a forced refresh failed; it will be
    /// overwritten by the regenerated report.
    CacheInvalidate { key: String, message: String },
    /// The generated report could not be cached.
    CacheWrite { key: String, message: String },
    /// A comparison address has no extracted details and was left out of
    /// the analysis.
    MissingComparisonDetails { address_id: String },
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: BmaReport,
    pub source: ReportSource,
    pub soft_failures: Vec<SoftFailure>,
}

impl ReportOutcome {
    fn unavailable(report: BmaReport) -> Self {
        Self {
            report,
            source: ReportSource::Unavailable,
            soft_failures: Vec::new(),
        }
    }
}

impl BmaService {
    /// Produce the BMA report for the current primary and enabled comparisons.
    ///
    /// With `force_refresh`, any cached entry for the current key is
    /// discarded and the report regenerated.
    pub async fn get_report(&self, force_refresh: bool) -> Result<ReportOutcome> {
        let primary = match self.store.find_primary_address().await? {
            Some(a) => a,
            None => {
                return Ok(ReportOutcome::unavailable(BmaReport {
                    opinion: NO_PRIMARY_OPINION.to_string(),
                    ..Default::default()
                }))
            }
        };

        let comparisons = self.store.find_comparison_addresses().await?;
        if comparisons.is_empty() {
            return Ok(ReportOutcome::unavailable(BmaReport {
                primary_address: Some(primary),
                opinion: NO_COMPARISONS_OPINION.to_string(),
                ..Default::default()
            }));
        }

        let key = CacheKey::new(primary.id.clone(), comparisons.iter().map(|a| a.id.clone()));
        let mut soft_failures = Vec::new();

        if force_refresh {
            match self.store.delete_cached_report(&key).await {
                Ok(removed) => tracing::info!(key = %key, removed, "Forced report refresh"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete cached report");
                    soft_failures.push(SoftFailure::CacheInvalidate {
                        key: key.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        } else {
            match self.store.get_cached_report(&key).await {
                Ok(Some(cached)) if is_fresh(cached.generated_at, Utc::now(), self.cache_ttl) => {
                    tracing::info!(key = %key, "Serving cached report");
                    return Ok(ReportOutcome {
                        report: cached.report,
                        source: ReportSource::Cached,
                        soft_failures,
                    });
                }
                Ok(Some(_)) => tracing::info!(key = %key, "Cached report is stale"),
                Ok(None) => tracing::info!(key = %key, "No cached report"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to read cached report");
                    soft_failures.push(SoftFailure::CacheRead {
                        key: key.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let primary_details = self
            .load_details(&primary)
            .await?
            .ok_or_else(|| BmaError::MissingDetails {
                address: primary.address_str.clone(),
            })?;

        let mut comparison_details = Vec::with_capacity(comparisons.len());
        for address in &comparisons {
            match self.load_details(address).await? {
                Some(details) => comparison_details.push(details.for_comparison()),
                None => {
                    tracing::warn!(
                        address = %address.address_str,
                        "Comparison address has no property details; excluded"
                    );
                    soft_failures.push(SoftFailure::MissingComparisonDetails {
                        address_id: address.id.clone(),
                    });
                }
            }
        }

        let analysis = self
            .generator
            .generate(&primary_details, &comparison_details)
            .await?;

        let report = BmaReport {
            primary_address: Some(primary),
            comparison_addresses: Some(comparisons),
            opinion: analysis.recommendation.clone(),
            detailed_analysis: Some(analysis),
        };

        let entry = CachedBmaReport::new(&key, Utc::now(), report.clone());
        match self.store.upsert_cached_report(&entry).await {
            Ok(()) => tracing::info!(key = %key, "Cached generated report"),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to cache BMA report");
                soft_failures.push(SoftFailure::CacheWrite {
                    key: key.to_string(),
                    message: e.to_string(),
                });
            }
        }

        Ok(ReportOutcome {
            report,
            source: ReportSource::Generated,
            soft_failures,
        })
    }

    /// Extracted details for an address, or `None` if it has no raw page
    /// or the page has no details.
    async fn load_details(&self, address: &Address) -> Result<Option<PropertyDetails>> {
        let raw_id = match &address.raw_page_id {
            Some(id) => id,
            None => return Ok(None),
        };
        let page = self.store.get_raw_page(raw_id).await?;
        Ok(page.and_then(|p| p.property_details))
    }
}
