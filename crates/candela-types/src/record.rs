//! JSON-compatible records handed to sinks and topics.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::CandelaError;

/// A flat JSON object: the unit of delivery for candles and raw feature rows.
pub type Record = Map<String, Value>;

/// Serializes a value into a [`Record`].
///
/// # Errors
///
/// Returns an error if serialization fails or the value is not a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, CandelaError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(CandelaError::Json(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

/// Renders a record field as a key string.
///
/// Strings are returned unquoted; numbers and booleans use their JSON text.
/// Returns `None` for missing, null, array or object fields.
#[must_use]
pub fn field_as_key(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
