//! Streaming trade-to-candle aggregation over event-time tumbling windows.

use std::time::Duration;

use candela_types::{Trade, WindowBounds, WindowDuration};
use tracing::{debug, warn};

use crate::Candle;

/// Counters kept by a [`CandleAggregator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Trades folded into a window.
    pub trades_accepted: u64,
    /// Trades dropped because their window had already closed.
    pub late_trades: u64,
    /// Trades dropped because they belong to another instrument.
    pub foreign_trades: u64,
    /// Candles emitted.
    pub candles_emitted: u64,
}

/// Streaming candle aggregator for a single instrument.
///
/// Holds at most one open window. A window closes when a trade for a later
/// window arrives, when [`finish`](Self::finish) is called at end of stream,
/// or through the opt-in [`flush_idle`](Self::flush_idle). Once a window has
/// been emitted, trades that fall into it or any earlier window are late and
/// are dropped.
#[derive(Debug)]
pub struct CandleAggregator {
    instrument_id: String,
    window: WindowDuration,
    current: Option<WindowState>,
    /// End of the last emitted window; trades before it are late.
    watermark_ms: Option<i64>,
    stats: AggregatorStats,
}

impl CandleAggregator {
    /// Creates a new aggregator for the given instrument and window length.
    #[must_use]
    pub fn new(instrument_id: impl Into<String>, window: WindowDuration) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            window,
            current: None,
            watermark_ms: None,
            stats: AggregatorStats::default(),
        }
    }

    /// Returns the instrument being aggregated.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Returns the window length.
    #[must_use]
    pub const fn window(&self) -> WindowDuration {
        self.window
    }

    /// Returns the bounds of the currently open window, if any.
    #[must_use]
    pub fn open_window(&self) -> Option<WindowBounds> {
        self.current.as_ref().map(|state| state.bounds)
    }

    /// Returns the end of the last emitted window.
    #[must_use]
    pub const fn watermark_ms(&self) -> Option<i64> {
        self.watermark_ms
    }

    /// Returns the aggregation counters.
    #[must_use]
    pub const fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Processes a trade, potentially emitting a completed candle.
    ///
    /// Returns `Some(candle)` when the trade opens a window later than the
    /// open one, `None` otherwise.
    pub fn process(&mut self, trade: &Trade) -> Option<Candle> {
        if trade.instrument_id() != self.instrument_id {
            self.stats.foreign_trades += 1;
            warn!(
                expected = %self.instrument_id,
                got = trade.instrument_id(),
                "dropping trade for another instrument"
            );
            return None;
        }

        let bounds = self.window.bounds(trade.event_time_ms());
        if self.watermark_ms.is_some_and(|watermark| bounds.start_ms < watermark) {
            self.record_late(trade);
            return None;
        }

        match self.current.take() {
            Some(mut state) if state.bounds == bounds => {
                state.update(trade);
                self.current = Some(state);
                self.stats.trades_accepted += 1;
                None
            }
            Some(state) if bounds.start_ms > state.bounds.start_ms => {
                let completed = self.emit(state);
                self.open(bounds, trade);
                Some(completed)
            }
            Some(state) => {
                self.current = Some(state);
                self.record_late(trade);
                None
            }
            None => {
                self.open(bounds, trade);
                None
            }
        }
    }

    /// Closes and returns the open window at end of stream.
    pub fn finish(&mut self) -> Option<Candle> {
        self.current.take().map(|state| self.emit(state))
    }

    /// Closes the open window if wall-clock time has passed its end by `grace`.
    pub fn flush_idle(&mut self, now_ms: i64, grace: Duration) -> Option<Candle> {
        let grace_ms = i64::try_from(grace.as_millis()).unwrap_or(i64::MAX);
        let due = self
            .current
            .as_ref()
            .is_some_and(|state| now_ms >= state.bounds.end_ms.saturating_add(grace_ms));
        if due { self.finish() } else { None }
    }

    /// Drops the open window without emitting it.
    ///
    /// Used after the source reconnected: the trades seen before the drop may
    /// be incomplete. The watermark is unchanged, so the window may reopen
    /// from trades delivered after the reconnect.
    pub fn discard_open_window(&mut self) -> Option<WindowBounds> {
        self.current.take().map(|state| state.bounds)
    }

    fn open(&mut self, bounds: WindowBounds, trade: &Trade) {
        debug!(
            instrument = %self.instrument_id,
            start_ms = bounds.start_ms,
            end_ms = bounds.end_ms,
            "opening window"
        );
        self.current = Some(WindowState::new(bounds, trade));
        self.stats.trades_accepted += 1;
    }

    fn emit(&mut self, state: WindowState) -> Candle {
        self.watermark_ms = Some(state.bounds.end_ms);
        self.stats.candles_emitted += 1;
        let candle = state.finish(self.instrument_id.clone());
        debug_assert!(candle.is_consistent());
        candle
    }

    fn record_late(&mut self, trade: &Trade) {
        self.stats.late_trades += 1;
        warn!(
            instrument = %self.instrument_id,
            event_time_ms = trade.event_time_ms(),
            watermark_ms = ?self.watermark_ms,
            open_window = ?self.open_window(),
            "dropping late trade"
        );
    }
}

/// Running aggregate for the open window.
#[derive(Debug)]
struct WindowState {
    bounds: WindowBounds,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    trade_count: u32,
}

impl WindowState {
    const fn new(bounds: WindowBounds, trade: &Trade) -> Self {
        let price = trade.price();
        Self {
            bounds,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: trade.quantity(),
            trade_count: 1,
        }
    }

    fn update(&mut self, trade: &Trade) {
        let price = trade.price();
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += trade.quantity();
        self.trade_count = self.trade_count.saturating_add(1);
    }

    const fn finish(self, instrument_id: String) -> Candle {
        Candle::new(
            instrument_id,
            self.bounds.end_ms,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.trade_count,
        )
    }
}

/// Aggregates a complete trade sequence into candles, including the final
/// partial window.
#[must_use]
pub fn aggregate_trades<'a, I>(trades: I, instrument_id: &str, window: WindowDuration) -> Vec<Candle>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut aggregator = CandleAggregator::new(instrument_id, window);
    let mut candles: Vec<Candle> = trades
        .into_iter()
        .filter_map(|trade| aggregator.process(trade))
        .collect();
    candles.extend(aggregator.finish());
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BTC: &str = "BTC/USD";

    fn ten_seconds() -> WindowDuration {
        WindowDuration::from_secs(10).unwrap()
    }

    fn trade(secs: i64, price: f64, quantity: f64) -> Trade {
        Trade::new(BTC, price, quantity, secs * 1000).unwrap()
    }

    #[test]
    fn test_window_scenario() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());

        assert!(agg.process(&trade(0, 100.0, 1.0)).is_none());
        assert!(agg.process(&trade(5, 105.0, 2.0)).is_none());
        assert!(agg.process(&trade(9, 95.0, 1.0)).is_none());

        let candle = agg.process(&trade(10, 110.0, 1.0)).unwrap();
        assert_eq!(candle.instrument_id(), BTC);
        assert_eq!(candle.window_end_ms(), 10_000);
        assert_relative_eq!(candle.open(), 100.0);
        assert_relative_eq!(candle.high(), 105.0);
        assert_relative_eq!(candle.low(), 95.0);
        assert_relative_eq!(candle.close(), 95.0);
        assert_relative_eq!(candle.volume(), 4.0);
        assert_eq!(candle.trade_count(), 3);

        assert_eq!(
            agg.open_window(),
            Some(WindowBounds { start_ms: 10_000, end_ms: 20_000 })
        );

        let open = agg.finish().unwrap();
        assert_eq!(open.window_end_ms(), 20_000);
        assert_relative_eq!(open.open(), 110.0);
        assert_relative_eq!(open.high(), 110.0);
        assert_relative_eq!(open.low(), 110.0);
        assert_relative_eq!(open.close(), 110.0);
        assert_relative_eq!(open.volume(), 1.0);
    }

    #[test]
    fn test_equal_event_times_later_arrival_closes() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&trade(5, 100.0, 1.0));
        agg.process(&trade(5, 90.0, 2.0));

        let candle = agg.finish().unwrap();
        assert_relative_eq!(candle.open(), 100.0);
        assert_relative_eq!(candle.high(), 100.0);
        assert_relative_eq!(candle.low(), 90.0);
        assert_relative_eq!(candle.close(), 90.0);
        assert_relative_eq!(candle.volume(), 3.0);
        assert_eq!(candle.trade_count(), 2);
    }

    #[test]
    fn test_boundary_trade_opens_next_window() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&Trade::new(BTC, 1.0, 1.0, 9_999).unwrap());
        let candle = agg.process(&Trade::new(BTC, 2.0, 1.0, 10_000).unwrap());
        assert_eq!(candle.map(|c| c.window_end_ms()), Some(10_000));
        assert_eq!(agg.open_window().map(|b| b.start_ms), Some(10_000));
    }

    #[test]
    fn test_gap_skips_empty_windows() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&trade(1, 1.0, 1.0));
        let candle = agg.process(&trade(45, 2.0, 1.0)).unwrap();
        assert_eq!(candle.window_end_ms(), 10_000);
        assert_eq!(agg.open_window().map(|b| b.end_ms), Some(50_000));
        assert_eq!(agg.stats().candles_emitted, 1);
    }

    #[test]
    fn test_late_trade_dropped() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&trade(0, 100.0, 1.0));
        agg.process(&trade(12, 101.0, 1.0));

        // Window [0, 10) is closed; this must not reopen or amend it.
        assert!(agg.process(&trade(3, 50.0, 7.0)).is_none());
        assert_eq!(agg.stats().late_trades, 1);

        let open = agg.finish().unwrap();
        assert_eq!(open.window_end_ms(), 20_000);
        assert_relative_eq!(open.low(), 101.0);
        assert_relative_eq!(open.volume(), 1.0);
    }

    #[test]
    fn test_earlier_window_while_open_is_late() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        // First window seen is [20, 30); nothing has been emitted yet.
        agg.process(&trade(25, 100.0, 1.0));
        assert!(agg.process(&trade(5, 90.0, 1.0)).is_none());
        assert_eq!(agg.stats().late_trades, 1);
        assert_eq!(agg.open_window().map(|b| b.start_ms), Some(20_000));
    }

    #[test]
    fn test_foreign_instrument_dropped() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        let eth = Trade::new("ETH/USD", 1.0, 1.0, 0).unwrap();
        assert!(agg.process(&eth).is_none());
        assert!(agg.open_window().is_none());
        assert_eq!(agg.stats().foreign_trades, 1);
    }

    #[test]
    fn test_finish_without_trades() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        assert!(agg.finish().is_none());
        assert_eq!(agg.stats(), AggregatorStats::default());
    }

    #[test]
    fn test_flush_idle() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&trade(1, 100.0, 1.0));

        let grace = Duration::from_secs(2);
        assert!(agg.flush_idle(11_999, grace).is_none());
        let candle = agg.flush_idle(12_000, grace).unwrap();
        assert_eq!(candle.window_end_ms(), 10_000);

        // The window is closed now, so a straggler is late.
        assert!(agg.process(&trade(9, 100.0, 1.0)).is_none());
        assert_eq!(agg.stats().late_trades, 1);
    }

    #[test]
    fn test_discard_open_window_keeps_watermark() {
        let mut agg = CandleAggregator::new(BTC, ten_seconds());
        agg.process(&trade(1, 100.0, 1.0));
        agg.process(&trade(11, 100.0, 1.0));

        let discarded = agg.discard_open_window();
        assert_eq!(discarded, Some(WindowBounds { start_ms: 10_000, end_ms: 20_000 }));
        assert_eq!(agg.watermark_ms(), Some(10_000));

        // The discarded window was never emitted and may be rebuilt.
        assert!(agg.process(&trade(12, 99.0, 2.0)).is_none());
        let candle = agg.finish().unwrap();
        assert_eq!(candle.window_end_ms(), 20_000);
        assert_relative_eq!(candle.volume(), 2.0);
    }

    #[test]
    fn test_windows_strictly_increasing() {
        let trades: Vec<Trade> = (0..100)
            .map(|i| trade(i * 3, 100.0 + (i % 7) as f64, 1.0))
            .collect();
        let candles = aggregate_trades(&trades, BTC, ten_seconds());
        assert!(candles.windows(2).all(|w| w[0].window_end_ms() < w[1].window_end_ms()));
        assert_relative_eq!(candles.iter().map(Candle::volume).sum::<f64>(), 100.0);
        assert!(candles.iter().all(Candle::is_consistent));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let trades: Vec<Trade> = (0..50)
            .map(|i| trade(i * 2, 50.0 + ((i * 13) % 11) as f64, 0.5))
            .collect();
        let first = aggregate_trades(&trades, BTC, ten_seconds());
        let second = aggregate_trades(&trades, BTC, ten_seconds());
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
    }
}
