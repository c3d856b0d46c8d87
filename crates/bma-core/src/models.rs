//! Core data models for listings, addresses, and BMA reports.
//!
//! JSON field names are camelCase: they are shared with the browser
//! extension, the frontend, and the LLM prompt schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::report::CacheKey;

/// Structured attributes of a single listing, as extracted by the LLM.
///
/// Every field is optional on the wire: a missing or `null` value
/// deserializes to the type's zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyDetails {
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub bedrooms: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub bathrooms: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub square_footage: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub year_built: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub property_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lot_size: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mls_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub days_on_market: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub last_price_change: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

impl PropertyDetails {
    /// Copy of these details with the listing-specific fields cleared.
    ///
    /// Days-on-market and the last price change describe the state of one
    /// listing, not the property, so they are zeroed before a property is
    /// used as a comparison.
    pub fn for_comparison(&self) -> Self {
        Self {
            days_on_market: 0,
            last_price_change: 0.0,
            ..self.clone()
        }
    }
}

/// A page submitted by the browser extension, with its extracted details.
///
/// Unique on the extracted address: re-submitting a listing for the same
/// address replaces url, content, and details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_details: Option<PropertyDetails>,
}

/// A tracked address with its comparison flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_page_id: Option<String>,
    pub address_str: String,
    /// Participates in the next report as a comparison.
    pub enabled: bool,
    /// The property being evaluated. At most one address holds this flag.
    pub primary: bool,
}

/// An [`Address`] joined with a summary of its extracted details.
///
/// Returned by the address listing endpoint; detail fields are omitted
/// when the address has no raw page or the page has no details.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressWithDetails {
    pub id: String,
    pub address_str: String,
    pub enabled: bool,
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i64>,
}

impl AddressWithDetails {
    pub fn new(address: &Address, details: Option<&PropertyDetails>) -> Self {
        let mut out = Self {
            id: address.id.clone(),
            address_str: address.address_str.clone(),
            enabled: address.enabled,
            primary: address.primary,
            ..Default::default()
        };
        if let Some(d) = details {
            out.price = Some(d.price);
            out.bedrooms = Some(d.bedrooms);
            out.bathrooms = Some(d.bathrooms);
            out.square_footage = Some(d.square_footage);
            out.property_type = Some(d.property_type.clone());
            out.year_built = Some(d.year_built);
        }
        out
    }
}

/// The Broker Market Analysis for the primary address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BmaReport {
    pub primary_address: Option<Address>,
    pub comparison_addresses: Option<Vec<Address>>,
    pub opinion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<DetailedAnalysis>,
}

/// Multi-section analysis generated by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailedAnalysis {
    #[serde(deserialize_with = "null_as_default")]
    pub primary_property_details: PropertyDetails,
    #[serde(deserialize_with = "null_as_default")]
    pub comparison_details: Vec<PropertyDetails>,
    #[serde(deserialize_with = "null_as_default")]
    pub price_analysis: String,
    #[serde(deserialize_with = "null_as_default")]
    pub feature_comparison: Vec<FeatureComparison>,
    #[serde(deserialize_with = "null_as_default")]
    pub market_trends: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recommendation: String,
}

/// One row of the feature-by-feature comparison table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureComparison {
    #[serde(deserialize_with = "null_as_default")]
    pub feature: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub primary_value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub comparison: Vec<ComparisonValue>,
    #[serde(deserialize_with = "null_as_default")]
    pub analysis: String,
}

/// A comparison property's value for one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonValue {
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

/// A persisted report, keyed by primary ID and sorted comparison IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedBmaReport {
    pub primary_address_id: String,
    /// Always sorted; see [`CacheKey`].
    pub comparison_address_ids: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub report: BmaReport,
}

impl CachedBmaReport {
    pub fn new(key: &CacheKey, generated_at: DateTime<Utc>, report: BmaReport) -> Self {
        Self {
            primary_address_id: key.primary_id().to_string(),
            comparison_address_ids: key.comparison_ids().to_vec(),
            generated_at,
            report,
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.primary_address_id.clone(),
            self.comparison_address_ids.iter().cloned(),
        )
    }
}

/// Operator-editable text appended to the analysis prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmInstructions {
    pub instructions: String,
    pub updated_at: DateTime<Utc>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Feature values are free-form; models emit `3`, `"3"`, or `null` for the
/// same field.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}
