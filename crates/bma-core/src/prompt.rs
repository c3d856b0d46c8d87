//! Prompt construction for property extraction and detailed analysis.
//!
//! Both prompts embed the exact JSON schema the reply must follow; the
//! replies are parsed with [`crate::reply::parse_reply`].

use crate::models::PropertyDetails;

const PROPERTY_SCHEMA: &str = r#"{
    "address": "string",
    "price": number,
    "bedrooms": number,
    "bathrooms": number,
    "squareFootage": number,
    "yearBuilt": number,
    "propertyType": "string",
    "lotSize": "string",
    "mlsNumber": "string",
    "daysOnMarket": number,
    "lastPriceChange": number,
    "description": "string"
}"#;

/// Build the extraction prompt for one listing page.
pub fn extraction_prompt(listing_text: &str) -> String {
    format!(
        "Extract the following property details from the given real estate listing text.\n\
         Return ONLY a JSON object with these exact fields (use null for missing values):\n\
         {schema}\n\n\
         Here is the listing text:\n\
         {listing_text}",
        schema = PROPERTY_SCHEMA,
    )
}

/// Pretty-printed JSON rendering of one property.
pub fn format_property(property: &PropertyDetails) -> String {
    serde_json::to_string_pretty(property).unwrap_or_default()
}

/// Numbered, pretty-printed rendering of the comparison properties.
pub fn format_comparisons(properties: &[PropertyDetails]) -> String {
    let mut out = String::new();
    for (i, prop) in properties.iter().enumerate() {
        out.push_str(&format!("Comparison Property {}:\n", i + 1));
        out.push_str(&format_property(prop));
        out.push_str("\n\n");
    }
    out
}

/// Build the detailed BMA prompt.
///
/// `instructions` is the operator-edited text; an empty string is fine.
pub fn analysis_prompt(
    primary: &PropertyDetails,
    comparisons: &[PropertyDetails],
    instructions: &str,
) -> String {
    format!(
        r#"Generate a detailed BMA (Broker Market Analysis) report comparing the following properties:

Primary Property:
{primary}

Comparison Properties:
{comparisons}

Additional Instructions:
{instructions}

Please provide a comprehensive analysis including:
1. Price analysis comparing the primary property to the comparisons
2. Detailed feature comparison (bedrooms, bathrooms, square footage, etc.)
3. Market trends and context
4. Final recommendation

Format the response as a JSON object with the following structure:
{{
    "primaryPropertyDetails": {schema},
    "comparisonDetails": [{schema}],
    "priceAnalysis": "string",
    "featureComparison": [
        {{
            "feature": "string",
            "primaryValue": "string",
            "comparison": [
                {{
                    "address": "string",
                    "value": "string"
                }}
            ],
            "analysis": "string"
        }}
    ],
    "marketTrends": "string",
    "recommendation": "string"
}}"#,
        primary = format_property(primary),
        comparisons = format_comparisons(comparisons),
        schema = PROPERTY_SCHEMA,
    )
}
