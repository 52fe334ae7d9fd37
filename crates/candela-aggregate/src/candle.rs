//! OHLCV candle data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use candela_types::{DataShapeError, datetime_from_ms};

/// OHLCV summary of all trades in one closed tumbling window.
///
/// Candles are only produced by the aggregator and carry no setters; once
/// emitted they are never amended. Deserialized candles are checked with
/// [`is_consistent`](Self::is_consistent) and rejected when they fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCandle")]
pub struct Candle {
    /// Instrument the trades belong to.
    #[serde(rename = "product_id")]
    instrument_id: String,
    /// Exclusive end of the window; the candle's timestamp.
    #[serde(rename = "timestamp_ms")]
    window_end_ms: i64,
    /// First trade's price.
    open: f64,
    /// Highest price in the window.
    high: f64,
    /// Lowest price in the window.
    low: f64,
    /// Last trade's price.
    close: f64,
    /// Sum of traded quantities.
    volume: f64,
    /// Number of trades folded into the candle.
    trade_count: u32,
}

impl Candle {
    /// Creates a candle from already-aggregated values.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub(crate) const fn new(
        instrument_id: String,
        window_end_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        trade_count: u32,
    ) -> Self {
        Self {
            instrument_id,
            window_end_ms,
            open,
            high,
            low,
            close,
            volume,
            trade_count,
        }
    }

    /// Returns the instrument identifier.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Returns the exclusive window end in epoch milliseconds.
    #[must_use]
    pub const fn window_end_ms(&self) -> i64 {
        self.window_end_ms
    }

    /// Returns the window end as a UTC datetime.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        datetime_from_ms(self.window_end_ms)
    }

    /// Returns the opening price.
    #[must_use]
    pub const fn open(&self) -> f64 {
        self.open
    }

    /// Returns the highest price.
    #[must_use]
    pub const fn high(&self) -> f64 {
        self.high
    }

    /// Returns the lowest price.
    #[must_use]
    pub const fn low(&self) -> f64 {
        self.low
    }

    /// Returns the closing price.
    #[must_use]
    pub const fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the number of trades in the window.
    #[must_use]
    pub const fn trade_count(&self) -> u32 {
        self.trade_count
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) candle.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) candle.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Returns true if the OHLCV invariants hold.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
            && self.volume >= 0.0
    }
}

/// Wire shape of a candle before the consistency check.
#[derive(Deserialize)]
struct RawCandle {
    #[serde(rename = "product_id", alias = "instrument_id")]
    instrument_id: String,
    #[serde(rename = "timestamp_ms", alias = "window_end_ms")]
    window_end_ms: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    trade_count: u32,
}

impl TryFrom<RawCandle> for Candle {
    type Error = DataShapeError;

    fn try_from(raw: RawCandle) -> Result<Self, Self::Error> {
        let candle = Self::new(
            raw.instrument_id,
            raw.window_end_ms,
            raw.open,
            raw.high,
            raw.low,
            raw.close,
            raw.volume,
            raw.trade_count,
        );
        if candle.is_consistent() {
            Ok(candle)
        } else {
            Err(DataShapeError::Malformed(format!(
                "inconsistent candle for {} at {}: high {} low {} volume {}",
                candle.instrument_id, candle.window_end_ms, candle.high, candle.low, candle.volume
            )))
        }
    }
}
