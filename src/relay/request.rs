//! Request description parsing and schema validation.
//!
//! # Responsibilities
//! - Define the caller-supplied `RequestDescription`
//! - Type-check an arbitrary JSON value against the fixed schema
//! - Report every field problem at once, with its location
//!
//! # Design Decisions
//! - Validation runs on a `serde_json::Value` so each failure carries a
//!   field path, not just the first serde error
//! - No coercion: numbers are not accepted where text is expected
//! - Unknown fields are ignored
//! - `headers` and `params` keep the caller's key order

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The outbound request a caller wants relayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescription {
    /// HTTP verb, any case.
    pub method: String,
    /// Fully-qualified target URL.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestDescription {
    /// Minimal description with only the required fields.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: None,
            params: None,
            body: None,
        }
    }
}

/// One field-level schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending value, starting at `"body"`.
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn new(loc: &[&str], msg: &str, kind: &str) -> Self {
        Self {
            loc: std::iter::once("body")
                .chain(loc.iter().copied())
                .map(str::to_string)
                .collect(),
            msg: msg.to_string(),
            kind: kind.to_string(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(&[field], "Field required", "missing")
    }

    fn not_a_string(loc: &[&str]) -> Self {
        Self::new(loc, "Input should be a valid string", "string_type")
    }

    fn not_a_mapping(field: &str) -> Self {
        Self::new(&[field], "Input should be a valid dictionary", "dict_type")
    }

    /// Error for a payload that is not parseable JSON at all.
    pub fn json_invalid(detail: impl fmt::Display) -> Self {
        Self::new(&[], &format!("JSON decode error: {detail}"), "json_invalid")
    }

    /// Error about the request body as a whole.
    pub fn body_error(msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// A request description that failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaValidationError {
    pub detail: Vec<FieldError>,
}

impl From<FieldError> for SchemaValidationError {
    fn from(error: FieldError) -> Self {
        Self { detail: vec![error] }
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.detail.len())?;
        for err in &self.detail {
            write!(f, "; {}: {}", err.loc.join("."), err.msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaValidationError {}

/// Validate an arbitrary JSON value as a `RequestDescription`.
pub fn validate(value: &Value) -> Result<RequestDescription, SchemaValidationError> {
    let Some(object) = value.as_object() else {
        return Err(FieldError::new(&[], "Input should be a valid dictionary", "dict_type").into());
    };

    let mut errors = Vec::new();
    let method = required_string(object, "method", &mut errors);
    let url = required_string(object, "url", &mut errors);
    let headers = optional_mapping(object, "headers", &mut errors);
    let params = optional_mapping(object, "params", &mut errors);
    let body = object.get("body").filter(|v| !v.is_null()).cloned();

    match (method, url) {
        (Some(method), Some(url)) if errors.is_empty() => Ok(RequestDescription {
            method,
            url,
            headers,
            params,
            body,
        }),
        _ => Err(SchemaValidationError { detail: errors }),
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match object.get(field) {
        None => {
            errors.push(FieldError::missing(field));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::not_a_string(&[field]));
            None
        }
    }
}

fn optional_mapping(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<IndexMap<String, String>> {
    match object.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::Object(entries)) => {
            let mut mapping = IndexMap::with_capacity(entries.len());
            let mut ok = true;
            for (name, value) in entries {
                match value {
                    Value::String(s) => {
                        mapping.insert(name.clone(), s.clone());
                    }
                    _ => {
                        ok = false;
                        errors.push(FieldError::not_a_string(&[field, name]));
                    }
                }
            }
            ok.then_some(mapping)
        }
        Some(_) => {
            errors.push(FieldError::not_a_mapping(field));
            None
        }
    }
}
