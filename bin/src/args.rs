//! Argument groups shared by the commands.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use candela_lib::url::{KRAKEN_REST_URL, KRAKEN_WS_URL};
use candela_lib::{
    Broker, FeatureGroup, PipelineConfig, RetryPolicy, TimeRange, WindowDuration,
};
use clap::Args;

/// Where trades come from.
#[derive(Args, Debug, Clone)]
pub(crate) struct SourceArgs {
    /// Instrument identifier (e.g., BTC/USD)
    #[arg(long, env = "PRODUCT_ID", default_value = "BTC/USD")]
    pub(crate) instrument: String,

    /// Replay the last N days instead of following the live feed
    #[arg(long, env = "LAST_N_DAYS")]
    pub(crate) lookback_days: Option<u32>,

    /// Replay trades from a JSON-lines file instead of the REST API
    #[arg(long, env = "CANDELA_HISTORY_FILE")]
    pub(crate) history_file: Option<PathBuf>,

    /// Live feed websocket URL
    #[arg(long, env = "CANDELA_ENDPOINT", default_value = KRAKEN_WS_URL)]
    pub(crate) endpoint: String,

    /// Historical REST API base URL
    #[arg(long, env = "CANDELA_REST_ENDPOINT", default_value = KRAKEN_REST_URL)]
    pub(crate) rest_endpoint: String,

    /// Longest wait for new data before the driver checks for shutdown (ms)
    #[arg(long, env = "CANDELA_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub(crate) poll_interval_ms: u64,

    /// Reconnect attempts after the live feed drops
    #[arg(long, env = "CANDELA_RECONNECT_ATTEMPTS", default_value_t = 5)]
    pub(crate) reconnect_attempts: u32,
}

impl SourceArgs {
    /// Returns true when a bounded replay was requested.
    pub(crate) const fn is_historical(&self) -> bool {
        self.lookback_days.is_some() || self.history_file.is_some()
    }

    /// Returns the replay range.
    ///
    /// A history file without a lookback replays everything up to now.
    pub(crate) fn time_range(&self) -> Result<TimeRange> {
        let now = chrono::Utc::now();
        match self.lookback_days {
            Some(days) => TimeRange::last_days(days, now)
                .with_context(|| format!("Invalid lookback: {days} days")),
            None => TimeRange::new(0, now.timestamp_millis() + 1).context("Invalid time range"),
        }
    }

    pub(crate) const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn reconnect_retry(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.reconnect_attempts)
    }
}

/// Candle settings.
#[derive(Args, Debug, Clone)]
pub(crate) struct WindowArgs {
    /// Candle length (e.g., 60, 10s, 1m)
    #[arg(long = "window-secs", env = "OHLC_WINDOW_SECONDS", default_value = "60")]
    pub(crate) window: WindowDuration,

    /// Close an idle window this many seconds after its end (wall clock)
    #[arg(long, env = "CANDELA_IDLE_GRACE_SECS")]
    pub(crate) idle_grace_secs: Option<u64>,
}

impl WindowArgs {
    /// Applies the window length and idle grace to `config`.
    pub(crate) fn apply(&self, config: PipelineConfig) -> PipelineConfig {
        let mut config = PipelineConfig {
            window: self.window,
            ..config
        };
        if let Some(secs) = self.idle_grace_secs {
            config = config.with_idle_grace(Duration::from_secs(secs));
        }
        config
    }
}

/// Feature store and batching settings.
#[derive(Args, Debug, Clone)]
pub(crate) struct StoreArgs {
    /// Directory of the local feature store
    #[arg(long, env = "CANDELA_STORE_DIR", default_value = "feature-store")]
    pub(crate) store_dir: PathBuf,

    /// Feature group name
    #[arg(long, env = "FEATURE_GROUP_NAME", default_value = "ohlcv")]
    pub(crate) feature_group: String,

    /// Feature group version
    #[arg(long, env = "FEATURE_GROUP_VERSION", default_value_t = 1)]
    pub(crate) feature_group_version: u32,

    /// Primary key fields, comma separated
    #[arg(
        long,
        env = "FEATURE_GROUP_PRIMARY_KEYS",
        value_delimiter = ',',
        default_value = "product_id,timestamp_ms"
    )]
    pub(crate) primary_keys: Vec<String>,

    /// Event time field
    #[arg(long, env = "FEATURE_GROUP_EVENT_TIME", default_value = "timestamp_ms")]
    pub(crate) event_time_field: String,
}

impl StoreArgs {
    pub(crate) fn group(&self) -> FeatureGroup {
        FeatureGroup::new(&self.feature_group, self.feature_group_version)
            .with_primary_keys(&self.primary_keys)
            .with_event_time_field(&self.event_time_field)
    }
}

/// Batch delivery settings.
#[derive(Args, Debug, Clone)]
pub(crate) struct BatchArgs {
    /// Records buffered before a flush to the store
    #[arg(long, env = "BUFFER_SIZE", default_value = "1")]
    pub(crate) batch_size: NonZeroUsize,

    /// Materialize the offline table on every flush
    #[arg(long, env = "MATERIALIZE_OFFLINE")]
    pub(crate) materialize_offline: bool,

    /// Attempts per flush before the run fails
    #[arg(long, env = "CANDELA_FLUSH_ATTEMPTS", default_value_t = 3)]
    pub(crate) flush_attempts: u32,
}

impl BatchArgs {
    pub(crate) fn pipeline_config(&self, window: WindowDuration) -> PipelineConfig {
        PipelineConfig::new(window)
            .with_batch_size(self.batch_size)
            .with_materialize_offline(self.materialize_offline)
            .with_flush_retry(
                RetryPolicy::default().with_max_retries(self.flush_attempts.saturating_sub(1)),
            )
    }
}

/// Topic log location.
#[derive(Args, Debug, Clone)]
pub(crate) struct BrokerArgs {
    /// Broker directory holding the topic logs
    #[arg(long, env = "CANDELA_BROKER")]
    pub(crate) broker: Option<PathBuf>,
}

impl BrokerArgs {
    pub(crate) fn open(&self) -> Result<Broker> {
        let path = self.broker.clone().unwrap_or_else(Broker::default_path);
        Broker::new(&path).with_context(|| format!("Failed to open broker at {}", path.display()))
    }
}
