//! Helpers for reading the raw JSON input the model streams to a tool.

use linksort_core::error::ToolError;
use serde_json::{Map, Value};

/// Parse raw tool input into a JSON object.
///
/// Blank input is treated as `{}`: tools without parameters are often
/// called with no input deltas at all.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, ToolError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ToolError::InvalidInput("Tool input must be a JSON object.".into())),
        Err(e) => Err(ToolError::InvalidInput(e.to_string())),
    }
}

/// A required, non-blank string field.
pub fn required_str(input: &Map<String, Value>, field: &'static str) -> Result<String, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Err(ToolError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ToolError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ToolError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

pub fn optional_str(input: &Map<String, Value>, field: &'static str) -> Result<Option<String>, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ToolError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

pub fn optional_bool(input: &Map<String, Value>, field: &'static str) -> Result<Option<bool>, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidField {
            field,
            expected: "a boolean",
        }),
    }
}

pub fn optional_u32(input: &Map<String, Value>, field: &'static str) -> Result<Option<u32>, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(ToolError::InvalidField {
                field,
                expected: "a non-negative integer",
            }),
    }
}

/// Serialize a tool's success payload.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value).map_err(|e| ToolError::Output(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_an_empty_object() {
        assert!(parse_object("").unwrap().is_empty());
        assert!(parse_object("  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let err = parse_object("{\"name\":").unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref msg) if msg.contains("EOF")));
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(parse_object("[1,2]").is_err());
    }

    #[test]
    fn required_field_errors_name_the_field() {
        let input = parse_object(r#"{"name": 5, "empty": "  "}"#).unwrap();
        assert_eq!(
            required_str(&input, "name").unwrap_err().to_string(),
            "The 'name' field must be a string."
        );
        assert_eq!(
            required_str(&input, "empty").unwrap_err(),
            ToolError::MissingField("empty")
        );
        assert_eq!(
            required_str(&input, "folder_id").unwrap_err(),
            ToolError::MissingField("folder_id")
        );
    }

    #[test]
    fn optional_numbers_reject_negatives() {
        let input = parse_object(r#"{"page": -1, "size": 3}"#).unwrap();
        assert!(optional_u32(&input, "page").is_err());
        assert_eq!(optional_u32(&input, "size").unwrap(), Some(3));
        assert_eq!(optional_u32(&input, "missing").unwrap(), None);
    }
}
