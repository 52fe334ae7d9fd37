//! Synthetic inputs for the candela benchmarks.

use candela_lib::Trade;
use chrono::{DateTime, SecondsFormat};

/// Generates `count` trades for `instrument_id`, `spacing_ms` apart from `start_ms`.
///
/// Prices follow a small deterministic zig-zag so that every window has a
/// distinct high and low.
#[must_use]
pub fn synthetic_trades(
    instrument_id: &str,
    count: usize,
    start_ms: i64,
    spacing_ms: i64,
) -> Vec<Trade> {
    (0..count)
        .filter_map(|i| {
            let step = (i % 7) as f64 - 3.0;
            let price = 42_000.0 + step * 0.5;
            let quantity = 0.01 + (i % 5) as f64 * 0.01;
            Trade::new(instrument_id, price, quantity, start_ms + i as i64 * spacing_ms).ok()
        })
        .collect()
}

/// Builds one live feed trade frame carrying `count` trades.
#[must_use]
pub fn trade_frame(instrument_id: &str, count: usize, start_ms: i64) -> String {
    let items: Vec<String> = synthetic_trades(instrument_id, count, start_ms, 250)
        .iter()
        .map(|trade| {
            let timestamp = DateTime::from_timestamp_millis(trade.event_time_ms())
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
                .unwrap_or_default();
            format!(
                r#"{{"symbol":"{}","side":"buy","price":{},"qty":{},"timestamp":"{}"}}"#,
                trade.instrument_id(),
                trade.price(),
                trade.quantity(),
                timestamp
            )
        })
        .collect();
    format!(r#"{{"channel":"trade","type":"update","data":[{}]}}"#, items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_lib::frame::{Frame, parse_frame};

    #[test]
    fn test_synthetic_trades_are_ordered() {
        let trades = synthetic_trades("BTC/USD", 100, 0, 10);
        assert_eq!(trades.len(), 100);
        assert!(trades.windows(2).all(|w| w[0].event_time_ms() < w[1].event_time_ms()));
    }

    #[test]
    fn test_trade_frame_parses() {
        let frame = trade_frame("BTC/USD", 3, 1_704_067_200_000);
        let Frame::Trades(trades) = parse_frame(&frame).unwrap() else {
            panic!("expected trades");
        };
        assert_eq!(trades.len(), 3);
        assert!(trades.iter().all(Result::is_ok));
    }
}
