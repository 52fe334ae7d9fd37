//! Batching sinks, feature stores and publishers for candela.
//!
//! This crate provides the delivery side of the pipeline:
//!
//! - [`BatchSink`] - Buffers records and flushes them to a store in full batches
//! - [`FeatureStore`] - Upsert interface of a feature store
//! - [`FeatureGroup`] - Name, version and keys of a feature group
//! - [`LocalFeatureStore`] - Directory-backed store with Parquet materialization
//! - [`MemoryFeatureStore`] - In-memory store with injectable failures
//! - [`Publisher`] - Keyed record egress to a message transport

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod batch;
mod error;
mod group;
mod local;
mod memory;
mod publish;
mod store;

#[cfg(feature = "parquet")]
mod parquet;

pub use batch::BatchSink;
pub use error::{FlushError, StoreError};
pub use group::FeatureGroup;
pub use local::LocalFeatureStore;
pub use memory::MemoryFeatureStore;
pub use publish::Publisher;
pub use store::FeatureStore;

#[cfg(feature = "parquet")]
pub use crate::parquet::write_records;
