//! Driver errors.

use candela_sink::FlushError;
use candela_types::CandelaError;
use thiserror::Error;

/// Errors that end a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source failed with a non-transport error.
    #[error("Source failed: {0}")]
    Source(#[source] CandelaError),

    /// The source kept failing to reconnect.
    #[error("Reconnect failed after {attempts} attempts: {source}")]
    ReconnectExhausted {
        /// Reconnect attempts made.
        attempts: u32,
        /// The last error.
        #[source]
        source: CandelaError,
    },

    /// A batch could not be flushed within the retry budget.
    #[error("Flush failed after {attempts} attempts, {} records not delivered: {source}", source.records)]
    FlushExhausted {
        /// Flush attempts made.
        attempts: u32,
        /// The last flush error.
        #[source]
        source: FlushError,
    },

    /// A record could not be published downstream.
    #[error("Publish failed: {0}")]
    Publish(#[source] CandelaError),

    /// The source rejected the acknowledgement of handled input.
    #[error("Commit failed: {0}")]
    Commit(#[source] CandelaError),
}

impl PipelineError {
    /// Returns true for errors raised by the transport layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. })
    }
}
