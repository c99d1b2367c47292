//! Parsing of backend output into candidate row objects.

use serde_json::{Map, Value};

use crate::errors::BackendError;

/// One model-proposed row object.
pub type Candidate = Map<String, Value>;

/// Extract the `rows` list from a completion.
///
/// Malformed JSON is a decode error. A well-formed reply without a usable
/// `rows` array yields no candidates, and non-object entries are skipped.
pub fn parse_candidates(text: &str) -> Result<Vec<Candidate>, BackendError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|err| BackendError::Decode(err.to_string()))?;

    let rows = match value {
        Value::Object(mut object) => object.remove("rows"),
        _ => None,
    };
    let candidates = match rows {
        Some(Value::Array(rows)) => rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(object) => Some(object),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(candidates)
}

/// Cell text for a candidate value; `None` for JSON null.
pub fn value_to_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// De-duplication key for a candidate.
///
/// Uses the candidate's value for `identity_field` when present, otherwise
/// its first listed value, otherwise the row index.
pub fn identity_key(candidate: &Candidate, identity_field: Option<&str>, index: usize) -> String {
    identity_field
        .and_then(|field| candidate.get(field))
        .filter(|value| !value.is_null())
        .or_else(|| candidate.values().next())
        .map(|value| value_to_cell(value).unwrap_or_else(|| "null".to_string()))
        .unwrap_or_else(|| index.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Candidate {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn keeps_only_object_rows() {
        let text = r#"{"rows": [{"name": "Mars"}, "Venus", 3, {"name": "Earth"}]}"#;
        let candidates = parse_candidates(text).expect("parse");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1]["name"], "Earth");
    }

    #[test]
    fn missing_rows_is_empty_not_error() {
        assert!(parse_candidates(r#"{"data": []}"#).expect("parse").is_empty());
        assert!(parse_candidates(r#"{"rows": "none"}"#).expect("parse").is_empty());
        assert!(parse_candidates("[1, 2]").expect("parse").is_empty());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        assert!(matches!(
            parse_candidates("rows: Mars, Venus"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn cells_stringify_non_string_values() {
        assert_eq!(value_to_cell(&json!("Mars")), Some("Mars".to_string()));
        assert_eq!(value_to_cell(&json!(6.39e23)), Some("6.39e23".to_string()));
        assert_eq!(value_to_cell(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_cell(&json!(["a", 1])), Some(r#"["a",1]"#.to_string()));
        assert_eq!(value_to_cell(&Value::Null), None);
    }

    #[test]
    fn identity_prefers_designated_field() {
        let candidate = object(json!({"mass": 5, "name": "Mars"}));
        assert_eq!(identity_key(&candidate, Some("name"), 0), "Mars");
        assert_eq!(identity_key(&candidate, Some("radius"), 0), "5");
        assert_eq!(identity_key(&candidate, None, 0), "5");
        assert_eq!(identity_key(&Candidate::new(), Some("name"), 7), "7");
    }
}
