//! Tolerant parsing of LLM replies.
//!
//! Models are asked for a bare JSON object but routinely wrap it in prose
//! or markdown fences. The object is taken to span from the first `{` to
//! the last `}` of the reply; everything outside is discarded.

use serde::de::DeserializeOwned;

use crate::llm::LlmError;

/// Locate the JSON object in a free-form reply.
///
/// Returns [`LlmError::MalformedJson`] when the reply has no `{ ... }` pair.
pub fn extract_json_object(reply: &str) -> Result<&str, LlmError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&reply[s..=e]),
        _ => Err(LlmError::MalformedJson(
            "no JSON object found in reply".to_string(),
        )),
    }
}

/// Extract the JSON object from `reply` and deserialize it into `T`.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, LlmError> {
    let json = extract_json_object(reply)?;
    serde_json::from_str(json)
        .map_err(|e| LlmError::MalformedJson(format!("failed to parse JSON response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyDetails;

    #[test]
    fn test_bare_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_object_in_prose_and_fences() {
        let reply = "Sure! Here it is:\n```json\n{\"address\": \"1 Main St\"}\n```\nLet me know.";
        assert_eq!(
            extract_json_object(reply).unwrap(),
            "{\"address\": \"1 Main St\"}"
        );
    }

    #[test]
    fn test_nested_object_uses_last_brace() {
        let reply = r#"x {"a": {"b": 1}} y"#;
        assert_eq!(extract_json_object(reply).unwrap(), r#"{"a": {"b": 1}}"#);
    }

    #[test]
    fn test_no_braces_is_malformed() {
        let err = extract_json_object("I could not find a listing.").unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }

    #[test]
    fn test_reversed_braces_is_malformed() {
        let err = extract_json_object("} nothing {").unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }

    #[test]
    fn test_invalid_json_between_braces() {
        let err = parse_reply::<PropertyDetails>("{address: 1 Main}").unwrap_err();
        assert!(matches!(err, LlmError::MalformedJson(_)));
    }

    #[test]
    fn test_parse_property_details() {
        let reply = r#"Result: {"address": "9 Pine Rd", "price": 525000, "bedrooms": 4, "bathrooms": 2.5}"#;
        let details: PropertyDetails = parse_reply(reply).unwrap();
        assert_eq!(details.address, "9 Pine Rd");
        assert_eq!(details.price, 525000.0);
        assert_eq!(details.bedrooms, 4);
        assert_eq!(details.bathrooms, 2.5);
        assert_eq!(details.year_built, 0);
    }
}
