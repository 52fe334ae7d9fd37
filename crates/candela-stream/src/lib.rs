//! File-backed topic log connecting candela services.
//!
//! A broker is a directory; each topic is an append-only JSON-lines file and
//! each consumer group keeps its committed byte offset next to it:
//!
//! - [`Broker`] - Topic directory and factory for producers and consumers
//! - [`TopicProducer`] - Appends keyed records, implements `Publisher`
//! - [`TopicConsumer`] - Reads from the committed offset, implements `RecordSource`
//! - [`TopicTradeSource`] - Reads trades from a topic, implements `TradeSource`

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod broker;
mod consumer;
mod entry;
mod error;
mod producer;
mod trades;

pub use broker::Broker;
pub use consumer::TopicConsumer;
pub use entry::TopicEntry;
pub use error::TopicError;
pub use producer::TopicProducer;
pub use trades::TopicTradeSource;
