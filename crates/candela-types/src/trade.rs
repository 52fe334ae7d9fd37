//! Trade event representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DataShapeError, datetime_from_ms};

/// A single executed trade.
///
/// A `Trade` can only be built through [`Trade::new`] (or deserialized, which
/// goes through the same checks), so every value satisfies `price > 0`,
/// `quantity > 0` and `event_time_ms >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTrade", into = "RawTrade")]
pub struct Trade {
    instrument_id: String,
    price: f64,
    quantity: f64,
    event_time_ms: i64,
}

impl Trade {
    /// Creates a validated trade.
    ///
    /// # Errors
    ///
    /// Returns a [`DataShapeError`] if the instrument is empty, the price or
    /// quantity is not a positive finite number, or the event time is negative.
    pub fn new(
        instrument_id: impl Into<String>,
        price: f64,
        quantity: f64,
        event_time_ms: i64,
    ) -> Result<Self, DataShapeError> {
        let instrument_id = instrument_id.into();
        if instrument_id.trim().is_empty() {
            return Err(DataShapeError::MissingField("instrument_id"));
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(DataShapeError::NonPositivePrice(price));
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(DataShapeError::NonPositiveQuantity(quantity));
        }
        if event_time_ms < 0 {
            return Err(DataShapeError::NegativeEventTime(event_time_ms));
        }
        Ok(Self {
            instrument_id,
            price,
            quantity,
            event_time_ms,
        })
    }

    /// Returns the instrument identifier (e.g., "BTC/USD").
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Returns the traded price.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Returns the traded quantity.
    #[must_use]
    pub const fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the event time in epoch milliseconds.
    #[must_use]
    pub const fn event_time_ms(&self) -> i64 {
        self.event_time_ms
    }

    /// Returns the event time as a UTC datetime.
    #[must_use]
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        datetime_from_ms(self.event_time_ms)
    }

    /// Returns the notional value (price * quantity).
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Trade fields as read from an external source, before validation.
///
/// Field names follow the wire format used on the trades topic
/// (`product_id`, `timestamp_ms`); the pipeline names are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    /// Instrument identifier.
    #[serde(rename = "product_id", alias = "instrument_id", default)]
    pub instrument_id: Option<String>,
    /// Traded price.
    #[serde(default)]
    pub price: Option<f64>,
    /// Traded quantity.
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Event time in epoch milliseconds.
    #[serde(rename = "timestamp_ms", alias = "event_time_ms", default)]
    pub event_time_ms: Option<i64>,
}

impl RawTrade {
    /// Validates the raw fields into a [`Trade`].
    ///
    /// # Errors
    ///
    /// Returns [`DataShapeError::MissingField`] for absent fields, or the
    /// error from [`Trade::new`] for out-of-range values.
    pub fn validate(self) -> Result<Trade, DataShapeError> {
        let instrument_id = self
            .instrument_id
            .ok_or(DataShapeError::MissingField("instrument_id"))?;
        let price = self.price.ok_or(DataShapeError::MissingField("price"))?;
        let quantity = self
            .quantity
            .ok_or(DataShapeError::MissingField("quantity"))?;
        let event_time_ms = self
            .event_time_ms
            .ok_or(DataShapeError::MissingField("event_time_ms"))?;
        Trade::new(instrument_id, price, quantity, event_time_ms)
    }
}

impl TryFrom<RawTrade> for Trade {
    type Error = DataShapeError;

    fn try_from(raw: RawTrade) -> Result<Self, Self::Error> {
        raw.validate()
    }
}

impl From<Trade> for RawTrade {
    fn from(trade: Trade) -> Self {
        Self {
            instrument_id: Some(trade.instrument_id),
            price: Some(trade.price),
            quantity: Some(trade.quantity),
            event_time_ms: Some(trade.event_time_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_new() {
        let trade = Trade::new("BTC/USD", 100.0, 0.5, 1_000).unwrap();
        assert_eq!(trade.instrument_id(), "BTC/USD");
        assert!((trade.notional() - 50.0).abs() < 1e-10);
        assert_eq!(trade.event_time_ms(), 1_000);
    }

    #[test]
    fn test_trade_rejects_bad_values() {
        assert_eq!(
            Trade::new("BTC/USD", 0.0, 1.0, 0),
            Err(DataShapeError::NonPositivePrice(0.0))
        );
        assert_eq!(
            Trade::new("BTC/USD", 1.0, -2.0, 0),
            Err(DataShapeError::NonPositiveQuantity(-2.0))
        );
        assert_eq!(
            Trade::new("BTC/USD", 1.0, 1.0, -1),
            Err(DataShapeError::NegativeEventTime(-1))
        );
        assert_eq!(
            Trade::new(" ", 1.0, 1.0, 0),
            Err(DataShapeError::MissingField("instrument_id"))
        );
        assert!(Trade::new("BTC/USD", f64::NAN, 1.0, 0).is_err());
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"product_id":"ETH/USD","price":2000.5,"quantity":1.25,"timestamp_ms":1700000000123}"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.instrument_id(), "ETH/USD");
        assert_eq!(trade.event_time_ms(), 1_700_000_000_123);
    }

    #[test]
    fn test_deserialize_pipeline_names() {
        let json = r#"{"instrument_id":"ETH/USD","price":1.0,"quantity":1.0,"event_time_ms":5}"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade.event_time_ms(), 5);
    }

    #[test]
    fn test_deserialize_rejects_missing_field() {
        let json = r#"{"product_id":"ETH/USD","price":1.0,"timestamp_ms":5}"#;
        let err = serde_json::from_str::<Trade>(json).unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let trade = Trade::new("ETH/USD", 1.0, 2.0, 3).unwrap();
        let value = serde_json::to_value(&trade).unwrap();
        assert_eq!(value["product_id"], "ETH/USD");
        assert_eq!(value["timestamp_ms"], 3);
    }
}
