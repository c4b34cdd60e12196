//! Feature maps and their query-string encoding.

use serde_json::Value;

/// Free-form transcription features (`model`, `punctuate`, `tier`, ...).
pub type Features = serde_json::Map<String, Value>;

/// Encodes a feature map as query pairs for the listen endpoint.
///
/// Booleans become `true`/`false`, numbers and strings are sent as text,
/// arrays repeat the key once per element, `null` is dropped and nested
/// objects are sent JSON-encoded.
pub fn encode_features(features: &Features) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(features.len());
    for (key, value) in features {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(value: Value) -> Features {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_encode_scalars() {
        let pairs = encode_features(&features(json!({
            "model": "whisper",
            "punctuate": true,
            "alternatives": 2,
            "tier": null,
        })));
        assert!(pairs.contains(&("model".into(), "whisper".into())));
        assert!(pairs.contains(&("punctuate".into(), "true".into())));
        assert!(pairs.contains(&("alternatives".into(), "2".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "tier"));
    }

    #[test]
    fn test_encode_arrays_repeat_key() {
        let pairs = encode_features(&features(json!({"keywords": ["alpha", "beta:2"]})));
        assert_eq!(
            pairs,
            vec![
                ("keywords".to_string(), "alpha".to_string()),
                ("keywords".to_string(), "beta:2".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_nested_object_as_json() {
        let pairs = encode_features(&features(json!({"extra": {"a": 1}})));
        assert_eq!(pairs, vec![("extra".to_string(), r#"{"a":1}"#.to_string())]);
    }
}
