//! Flattening of typed parameter structs into query-string pairs.
//!
//! Parameter structs derive `Serialize`; this module turns their JSON object
//! form into `(key, value)` pairs. Nulls are dropped, scalars are rendered
//! with their JSON text (strings unquoted), and arrays repeat the key once per
//! element.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

pub fn to_pairs<T: Serialize + ?Sized>(params: &T) -> Result<Vec<(String, String)>, ApiError> {
    let value =
        serde_json::to_value(params).map_err(|e| ApiError::SerializationError(e.to_string()))?;
    value_to_pairs(&value)
}

pub(crate) fn value_to_pairs(value: &Value) -> Result<Vec<(String, String)>, ApiError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(ApiError::SerializationError(format!(
                "query parameters must serialize to an object, got {other}"
            )))
        }
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(rendered) = scalar(item) {
                        pairs.push((key.clone(), rendered));
                    }
                }
            }
            other => {
                if let Some(rendered) = scalar(other) {
                    pairs.push((key.clone(), rendered));
                }
            }
        }
    }
    Ok(pairs)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// `serialize_with` helper for filters the API wants as one comma-separated
/// value.
pub(crate) fn comma_joined<S>(items: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&items.join(","))
}
