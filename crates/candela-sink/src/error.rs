//! Error types for stores and sinks.

use thiserror::Error;

/// Errors returned by a [`FeatureStore`](crate::FeatureStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record lacks a primary-key or event-time field.
    #[error("Record for feature group {group} is missing field {field}")]
    MissingField {
        /// Feature group display name.
        group: String,
        /// The missing field.
        field: String,
    },

    /// The store refused or failed the write.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Offline materialization is not available in this build.
    #[error("Offline materialization requires the parquet feature")]
    MaterializeUnsupported,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/Parquet error.
    #[error("Parquet error: {0}")]
    Parquet(String),
}

/// A batch flush failed; the batch is still buffered.
#[derive(Error, Debug)]
#[error("Flush of {records} records failed: {source}")]
pub struct FlushError {
    /// Number of records still buffered.
    pub records: usize,
    /// The store error.
    #[source]
    pub source: StoreError,
}
