//! Event-time conversions.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::DataShapeError;

/// Converts an ISO-8601 timestamp to epoch milliseconds.
///
/// Fractional seconds are truncated to millisecond precision. Strings with an
/// explicit offset (`Z`, `+02:00`) are honoured; strings without one are read
/// as UTC, never as host-local time.
///
/// # Errors
///
/// Returns [`DataShapeError::InvalidTimestamp`] if the string is not ISO-8601.
///
/// # Example
///
/// ```
/// use candela_types::iso8601_to_ms;
///
/// let ms = iso8601_to_ms("2024-01-01T00:36:45.456789Z").unwrap();
/// assert_eq!(ms, 1_704_069_405_456);
/// ```
pub fn iso8601_to_ms(timestamp: &str) -> Result<i64, DataShapeError> {
    let trimmed = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
        .map_err(|_| DataShapeError::InvalidTimestamp(timestamp.to_string()))
}

/// Converts epoch milliseconds to a UTC datetime.
///
/// Returns `None` when the value is outside chrono's representable range.
#[must_use]
pub fn datetime_from_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
