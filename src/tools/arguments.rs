use rmcp::model::JsonObject;
use serde_json::{Map, Value};

use crate::error::{BrowserError, Result};

/// Check `arguments` against a tool's input schema: required keys present,
/// declared JSON types and string `minLength` respected, and `default` values
/// filled in for omitted optional keys. Keys the schema does not mention are passed through.
pub fn validate_arguments(
    schema: &JsonObject,
    arguments: Option<Map<String, Value>>,
) -> Result<Map<String, Value>> {
    let mut args = arguments.unwrap_or_default();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let missing: Vec<&str> = required
            .iter()
            .filter_map(Value::as_str)
            .filter(|key| !args.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(BrowserError::InvalidArguments(format!(
                "missing required parameter(s): {}",
                missing.join(", ")
            )));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(args);
    };

    for (key, value) in &args {
        let Some(property) = properties.get(key) else {
            continue;
        };
        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !matches_type(expected, value) {
                return Err(BrowserError::InvalidArguments(format!(
                    "parameter '{key}' must be of type {expected}"
                )));
            }
        }
        if let (Some(min), Some(text)) = (
            property.get("minLength").and_then(Value::as_u64),
            value.as_str(),
        ) {
            if (text.trim().chars().count() as u64) < min {
                return Err(BrowserError::InvalidArguments(format!(
                    "parameter '{key}' must have at least {min} non-blank character(s)"
                )));
            }
        }
    }

    for (key, property) in properties {
        if args.contains_key(key) {
            continue;
        }
        if let Some(default) = property.get("default") {
            args.insert(key.clone(), default.clone());
        }
    }

    Ok(args)
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| BrowserError::InvalidArguments(format!("{key} parameter required")))
}

pub fn bool_arg(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> JsonObject {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "minLength": 1 },
                "fullPage": { "type": "boolean", "default": true }
            },
            "required": ["name"]
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn args(value: Value) -> Option<Map<String, Value>> {
        value.as_object().cloned()
    }

    #[test]
    fn fills_defaults() {
        let validated = validate_arguments(&schema(), args(json!({ "name": "home" }))).unwrap();
        assert_eq!(validated["fullPage"], json!(true));
        assert_eq!(validated["name"], json!("home"));
    }

    #[test]
    fn keeps_explicit_values() {
        let validated =
            validate_arguments(&schema(), args(json!({ "name": "a", "fullPage": false }))).unwrap();
        assert_eq!(validated["fullPage"], json!(false));
    }

    #[test]
    fn missing_required_is_rejected() {
        let err = validate_arguments(&schema(), None).unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = validate_arguments(&schema(), args(json!({ "name": 42 }))).unwrap_err();
        assert!(err.to_string().contains("must be of type string"));
    }

    #[test]
    fn blank_string_fails_min_length() {
        for name in ["", "   "] {
            let err = validate_arguments(&schema(), args(json!({ "name": name }))).unwrap_err();
            assert_eq!(err.kind(), "invalid_arguments");
            assert!(err.to_string().contains("'name' must have at least 1"));
        }
    }

    #[test]
    fn unknown_keys_pass_through() {
        let validated =
            validate_arguments(&schema(), args(json!({ "name": "a", "extra": 1 }))).unwrap();
        assert_eq!(validated["extra"], json!(1));
    }

    #[test]
    fn integer_type_rejects_fractions() {
        assert!(matches_type("integer", &json!(3)));
        assert!(!matches_type("integer", &json!(3.5)));
        assert!(matches_type("number", &json!(3.5)));
    }
}
