//! Event-time tumbling window OHLCV aggregation for candela.
//!
//! This crate turns an ordered stream of trades into candles:
//!
//! - [`Candle`] - Immutable OHLCV summary of one closed window
//! - [`CandleAggregator`] - Per-instrument window state machine
//! - [`AggregatorStats`] - Counters for accepted, late and foreign trades

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod candle;

pub use aggregator::{AggregatorStats, CandleAggregator, aggregate_trades};
pub use candle::Candle;
