//! Live and historical trade sources for candela.
//!
//! This crate provides the ingestion side of the pipeline:
//!
//! - [`TradeSource`] / [`RecordSource`] - Pull-based capability traits
//! - [`KrakenLiveSource`] - Kraken v2 websocket trade feed
//! - [`HistoricalSource`] - Bounded replay over a [`TradeHistory`]
//! - [`KrakenRestHistory`] / [`JsonlHistory`] - Historical trade queries
//! - [`RestClient`] - HTTP client with retries for the REST history
//! - [`frame`] - Kraken websocket frame parsing

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod frame;
mod historical;
mod history;
mod live;
mod source;
pub mod url;

pub use client::{RestClient, RestClientConfig};
pub use error::TransportError;
pub use historical::HistoricalSource;
pub use history::{JsonlHistory, KrakenRestHistory, RestPage, TradeHistory, parse_rest_page};
pub use live::{KrakenLiveSource, LiveFeedConfig};
pub use source::{RecordSource, TradeSource};
