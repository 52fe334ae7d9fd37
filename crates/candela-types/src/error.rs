//! Error types for candela.

use thiserror::Error;

/// Result type alias for candela operations.
pub type Result<T> = std::result::Result<T, CandelaError>;

/// Errors that can occur while ingesting, aggregating and delivering records.
#[derive(Error, Debug)]
pub enum CandelaError {
    /// The live connection dropped or delivered a frame that could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A historical query failed.
    #[error("Query error: {0}")]
    Query(String),

    /// A stream topic could not be read or written.
    #[error("Topic error: {0}")]
    Topic(String),

    /// A record violated the trade data shape.
    #[error(transparent)]
    DataShape(#[from] DataShapeError),

    /// Invalid window duration.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Invalid time range.
    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CandelaError {
    /// Returns true for errors raised by the live transport.
    ///
    /// These are the only errors a driver may answer with reconnect-and-resubscribe.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A trade record that cannot enter aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataShapeError {
    /// A required field is absent or empty.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Price is zero, negative or not finite.
    #[error("Non-positive price: {0}")]
    NonPositivePrice(f64),

    /// Quantity is zero, negative or not finite.
    #[error("Non-positive quantity: {0}")]
    NonPositiveQuantity(f64),

    /// Event time precedes the epoch.
    #[error("Negative event time: {0} ms")]
    NegativeEventTime(i64),

    /// Event time string is not ISO-8601.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The record is not valid JSON or has the wrong shape.
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// A numeric field could not be parsed.
    #[error("Invalid number in field {field}: {value}")]
    InvalidNumber {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending raw value.
        value: String,
    },
}

/// Error for invalid window durations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Window durations must be at least one millisecond.
    #[error("Window duration must be positive")]
    Zero,

    /// The duration string could not be parsed.
    #[error("invalid window duration '{0}', expected e.g. 10, 10s, 500ms, 1m, 1h, 1d")]
    Parse(String),
}

/// Error for invalid time ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Start is not before end.
    #[error("Invalid time range: {start_ms} >= {end_ms}")]
    InvalidRange {
        /// Range start in epoch milliseconds.
        start_ms: i64,
        /// Range end in epoch milliseconds.
        end_ms: i64,
    },

    /// Lookback must cover at least one day.
    #[error("Lookback must be at least one day")]
    EmptyLookback,
}
