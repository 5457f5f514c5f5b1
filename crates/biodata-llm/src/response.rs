//! Recover a JSON object from free-form model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap());

fn as_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Try, in order: a fenced code block, the whole response, then the span from
/// the first `{` to the last `}`. Only JSON objects are accepted.
pub fn parse_response(response: &str) -> Option<Map<String, Value>> {
    if let Some(map) = FENCED
        .captures(response)
        .and_then(|c| c.get(1))
        .and_then(|m| as_object(m.as_str()))
    {
        return Some(map);
    }

    if let Some(map) = as_object(response) {
        return Some(map);
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    as_object(&response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        let map = parse_response(r#"{"age": 28}"#).unwrap();
        assert_eq!(map["age"], 28);
    }

    #[test]
    fn fenced_block() {
        let map = parse_response("Here you go:\n```json\n{\"gender\": \"Female\"}\n```\nDone.").unwrap();
        assert_eq!(map["gender"], "Female");
    }

    #[test]
    fn embedded_in_prose() {
        let map = parse_response("Sure! {\"caste\": null, \"age\": 30} hope this helps").unwrap();
        assert_eq!(map["age"], 30);
        assert!(map["caste"].is_null());
    }

    #[test]
    fn arrays_and_garbage_rejected() {
        assert!(parse_response("[1, 2, 3]").is_none());
        assert!(parse_response("I could not find anything.").is_none());
        assert!(parse_response("} backwards {").is_none());
    }

    #[test]
    fn truncated_output_rejected() {
        assert!(parse_response(r#"{"full_name": "Asha", "age": 2"#).is_none());
    }
}
