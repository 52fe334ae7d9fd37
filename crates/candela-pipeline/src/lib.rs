//! Pipeline driver for candela.
//!
//! Wires a source, the candle aggregator and the downstream outputs into one
//! cooperative pull loop:
//!
//! - [`CandlePipeline`] - `TradeSource` to `CandleAggregator` to batch sink / publisher
//! - [`RecordPipeline`] - `RecordSource` straight to batch sink / publisher
//! - [`PipelineConfig`] - Window, batch size and retry budgets
//! - [`RunSummary`] - Counters reported when a run ends

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod candles;
mod config;
mod error;
mod output;
mod records;
mod summary;

pub use candela_types::RetryPolicy;
pub use candles::CandlePipeline;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use records::RecordPipeline;
pub use summary::RunSummary;
