//! Driver configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use candela_types::{RetryPolicy, WindowDuration};

const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(1) {
    Some(n) => n,
    None => unreachable!(),
};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tumbling window length.
    pub window: WindowDuration,
    /// Records buffered before a flush.
    pub batch_size: NonZeroUsize,
    /// Passed through to every store upsert.
    pub materialize_offline: bool,
    /// Retries of a failed flush before the run fails.
    pub flush_retry: RetryPolicy,
    /// Reconnect attempts after a transport error before the run fails.
    pub reconnect_retry: RetryPolicy,
    /// Closes the open window once wall-clock time passes its end by this much.
    ///
    /// `None` keeps the default behaviour: windows close only on a later
    /// trade or at end of stream.
    pub idle_grace: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: WindowDuration::ONE_MINUTE,
            batch_size: DEFAULT_BATCH_SIZE,
            materialize_offline: false,
            flush_retry: RetryPolicy::default().with_max_retries(3),
            reconnect_retry: RetryPolicy::default(),
            idle_grace: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for the given window with default settings.
    #[must_use]
    pub fn new(window: WindowDuration) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the materialize-offline flag.
    #[must_use]
    pub const fn with_materialize_offline(mut self, materialize_offline: bool) -> Self {
        self.materialize_offline = materialize_offline;
        self
    }

    /// Sets the flush retry policy.
    #[must_use]
    pub const fn with_flush_retry(mut self, policy: RetryPolicy) -> Self {
        self.flush_retry = policy;
        self
    }

    /// Sets the reconnect retry policy.
    #[must_use]
    pub const fn with_reconnect_retry(mut self, policy: RetryPolicy) -> Self {
        self.reconnect_retry = policy;
        self
    }

    /// Enables the idle grace flush.
    #[must_use]
    pub const fn with_idle_grace(mut self, grace: Duration) -> Self {
        self.idle_grace = Some(grace);
        self
    }
}
