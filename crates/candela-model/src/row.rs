//! Candle rows read back from a feature group.

use candela_types::{Record, field_as_key};
use serde::Serialize;

use crate::EvaluateError;

/// One candle as stored in a feature group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcRow {
    /// Exclusive end of the candle's window in epoch milliseconds.
    pub timestamp_ms: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl OhlcRow {
    /// Reads a row from a stored record.
    ///
    /// `row` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluateError::MissingField`] if a field is absent or not a
    /// number.
    pub fn from_record(row: usize, record: &Record) -> Result<Self, EvaluateError> {
        let number = |field: &'static str| {
            record
                .get(field)
                .and_then(serde_json::Value::as_f64)
                .ok_or(EvaluateError::MissingField { row, field })
        };
        let timestamp_ms = record
            .get("timestamp_ms")
            .and_then(serde_json::Value::as_i64)
            .ok_or(EvaluateError::MissingField {
                row,
                field: "timestamp_ms",
            })?;
        Ok(Self {
            timestamp_ms,
            open: number("open")?,
            high: number("high")?,
            low: number("low")?,
            close: number("close")?,
            volume: number("volume")?,
        })
    }
}

/// Selects the candles of one instrument, oldest first.
///
/// Rows with `timestamp_ms < since_ms` are skipped.
///
/// # Errors
///
/// Returns an error if a selected record is not a complete candle.
pub fn rows_from_records(
    records: &[Record],
    instrument_id: &str,
    since_ms: Option<i64>,
) -> Result<Vec<OhlcRow>, EvaluateError> {
    let mut rows = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if field_as_key(record, "product_id").as_deref() != Some(instrument_id) {
            continue;
        }
        let row = OhlcRow::from_record(i, record)?;
        if since_ms.is_none_or(|since| row.timestamp_ms >= since) {
            rows.push(row);
        }
    }
    rows.sort_by_key(|row| row.timestamp_ms);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn candle(product: &str, ts: i64, close: f64) -> Record {
        record(json!({
            "product_id": product,
            "timestamp_ms": ts,
            "open": close,
            "high": close,
            "low": close,
            "close": close,
            "volume": 1.0,
        }))
    }

    #[test]
    fn test_rows_filtered_and_sorted() {
        let records = vec![
            candle("BTC/USD", 3_000, 3.0),
            candle("ETH/USD", 1_500, 9.0),
            candle("BTC/USD", 1_000, 1.0),
            candle("BTC/USD", 2_000, 2.0),
        ];
        let rows = rows_from_records(&records, "BTC/USD", None).unwrap();
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);

        let recent = rows_from_records(&records, "BTC/USD", Some(2_000)).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_missing_field() {
        let records = vec![record(json!({"product_id": "BTC/USD", "timestamp_ms": 1}))];
        let err = rows_from_records(&records, "BTC/USD", None).unwrap_err();
        assert_eq!(err, EvaluateError::MissingField { row: 0, field: "open" });
    }
}
