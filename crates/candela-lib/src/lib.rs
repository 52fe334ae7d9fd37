//! Streaming trade-to-OHLCV candle pipeline.
//!
//! This is a facade crate that re-exports functionality from the candela
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use candela_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let range = TimeRange::last_days(1, chrono::Utc::now())?;
//!     let history = KrakenRestHistory::new(RestClient::with_defaults()?);
//!     let source = HistoricalSource::new(history, "BTC/USD", range);
//!
//!     let store = Arc::new(LocalFeatureStore::new("./feature-store"));
//!     let config = PipelineConfig::new(WindowDuration::from_secs(60)?);
//!     let mut pipeline = CandlePipeline::new(source, "BTC/USD", config)
//!         .with_store(store, FeatureGroup::new("ohlcv", 1));
//!
//!     let summary = pipeline.run(std::future::pending()).await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candela_types::*;

// Re-export aggregation
pub use candela_aggregate::{AggregatorStats, Candle, CandleAggregator, aggregate_trades};

// Re-export sources
#[cfg(feature = "source")]
pub use candela_source::{
    HistoricalSource, JsonlHistory, KrakenLiveSource, KrakenRestHistory, LiveFeedConfig,
    RecordSource, RestClient, RestClientConfig, TradeHistory, TradeSource, TransportError, frame,
    url,
};

// Re-export sinks and stores
#[cfg(feature = "sink")]
pub use candela_sink::{
    BatchSink, FeatureGroup, FeatureStore, FlushError, LocalFeatureStore, MemoryFeatureStore,
    Publisher, StoreError,
};

#[cfg(feature = "parquet")]
pub use candela_sink::write_records;

// Re-export the topic log
#[cfg(feature = "stream")]
pub use candela_stream::{
    Broker, TopicConsumer, TopicEntry, TopicError, TopicProducer, TopicTradeSource,
};

// Re-export the driver
#[cfg(feature = "pipeline")]
pub use candela_pipeline::{
    CandlePipeline, PipelineConfig, PipelineError, RecordPipeline, RunSummary,
};

// Re-export evaluation
#[cfg(feature = "model")]
pub use candela_model::{
    CurrentPriceBaseline, Dataset, EvaluateError, EvaluationReport, Evaluator, OhlcRow,
    TrainConfig, chronological_split, evaluate, mean_absolute_error, rows_from_records,
};

/// Prelude module for convenient imports.
///
/// ```
/// use candela_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candela_types::{
        CandelaError, DataShapeError, Record, Result, RetryPolicy, TimeRange, Trade,
        WindowDuration,
    };

    pub use candela_aggregate::{Candle, CandleAggregator};

    #[cfg(feature = "source")]
    pub use candela_source::{
        HistoricalSource, JsonlHistory, KrakenLiveSource, KrakenRestHistory, LiveFeedConfig,
        RecordSource, RestClient, TradeSource,
    };

    #[cfg(feature = "sink")]
    pub use candela_sink::{
        BatchSink, FeatureGroup, FeatureStore, LocalFeatureStore, MemoryFeatureStore, Publisher,
    };

    #[cfg(feature = "stream")]
    pub use candela_stream::{Broker, TopicConsumer, TopicProducer, TopicTradeSource};

    #[cfg(feature = "pipeline")]
    pub use candela_pipeline::{CandlePipeline, PipelineConfig, RecordPipeline, RunSummary};

    #[cfg(feature = "model")]
    pub use candela_model::{CurrentPriceBaseline, Evaluator, TrainConfig, evaluate};
}
