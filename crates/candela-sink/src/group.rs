//! Feature group descriptors.

use candela_types::{Record, field_as_key};
use derive_more::Display;

use crate::StoreError;

/// Identity and key layout of a feature group.
///
/// Displays as `name_vVERSION`, which is also the directory name used by
/// [`LocalFeatureStore`](crate::LocalFeatureStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{name}_v{version}")]
pub struct FeatureGroup {
    /// Group name.
    pub name: String,
    /// Group version.
    pub version: u32,
    /// Fields that identify a row; upserts replace rows with equal keys.
    pub primary_keys: Vec<String>,
    /// Field holding the row's event time.
    pub event_time_field: String,
}

impl FeatureGroup {
    /// Creates a group keyed by `product_id` and `timestamp_ms`, the candle
    /// wire field names.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            primary_keys: vec!["product_id".to_string(), "timestamp_ms".to_string()],
            event_time_field: "timestamp_ms".to_string(),
        }
    }

    /// Sets the primary-key fields.
    #[must_use]
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the event-time field.
    #[must_use]
    pub fn with_event_time_field(mut self, field: impl Into<String>) -> Self {
        self.event_time_field = field.into();
        self
    }

    /// Returns the primary key of a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingField`] if a key field or the event-time
    /// field is absent or not a scalar.
    pub fn key_of(&self, record: &Record) -> Result<Vec<String>, StoreError> {
        if field_as_key(record, &self.event_time_field).is_none() {
            return Err(self.missing(&self.event_time_field));
        }
        self.primary_keys
            .iter()
            .map(|field| field_as_key(record, field).ok_or_else(|| self.missing(field)))
            .collect()
    }

    fn missing(&self, field: &str) -> StoreError {
        StoreError::MissingField {
            group: self.to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(FeatureGroup::new("ohlcv", 2).to_string(), "ohlcv_v2");
    }

    #[test]
    fn test_key_of() {
        let group = FeatureGroup::new("ohlcv", 1);
        let row = record(json!({"product_id": "BTC/USD", "timestamp_ms": 10_000, "close": 1.0}));
        assert_eq!(group.key_of(&row).unwrap(), vec!["BTC/USD", "10000"]);
    }

    #[test]
    fn test_key_of_missing_field() {
        let group = FeatureGroup::new("ohlcv", 1).with_primary_keys(["product_id"]);
        let row = record(json!({"product_id": "BTC/USD"}));
        let err = group.key_of(&row).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingField { ref field, .. } if field == "timestamp_ms"
        ));
    }

    #[test]
    fn test_custom_event_time_field() {
        let group = FeatureGroup::new("trades", 1)
            .with_primary_keys(["id"])
            .with_event_time_field("ts");
        let row = record(json!({"id": 7, "ts": 1}));
        assert_eq!(group.key_of(&row).unwrap(), vec!["7"]);
    }
}
