//! Trade source selection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use candela_lib::{
    CandelaError, HistoricalSource, JsonlHistory, KrakenLiveSource, KrakenRestHistory,
    LiveFeedConfig, Record, RecordSource, RestClient, RestClientConfig, RetryPolicy,
    TradeSource, to_record,
};
use tracing::{info, warn};

use crate::args::SourceArgs;
use crate::progress::ProgressSource;

/// Opens the live feed, or a historical replay when a lookback or history
/// file is given.
pub(crate) async fn open_trade_source(
    args: &SourceArgs,
    quiet: bool,
) -> Result<Box<dyn TradeSource>> {
    if !args.is_historical() {
        let config = LiveFeedConfig::new(&args.instrument)
            .with_url(&args.endpoint)
            .with_poll_interval(args.poll_interval());
        let source = KrakenLiveSource::connect(config)
            .await
            .with_context(|| format!("Failed to subscribe to {} at {}", args.instrument, args.endpoint))?;
        info!(instrument = %args.instrument, endpoint = %args.endpoint, "following live feed");
        return Ok(Box::new(source));
    }

    let range = args.time_range()?;
    let label = args.instrument.as_str();
    if let Some(path) = &args.history_file {
        info!(instrument = %args.instrument, file = %path.display(), %range, "replaying history file");
        let source = HistoricalSource::new(JsonlHistory::new(path), label, range);
        return Ok(Box::new(ProgressSource::new(source, range, label, quiet)));
    }

    let client = RestClient::new(RestClientConfig::default().with_base_url(&args.rest_endpoint))
        .context("Failed to create HTTP client")?;
    info!(instrument = %args.instrument, endpoint = %args.rest_endpoint, %range, "replaying trade history");
    let source = HistoricalSource::new(KrakenRestHistory::new(client), label, range);
    Ok(Box::new(ProgressSource::new(source, range, label, quiet)))
}

/// Presents a trade source as raw trade records.
///
/// Transport errors are answered with reconnects under `retry`; the records
/// themselves are forwarded without aggregation.
pub(crate) struct TradeRecords<S> {
    trades: S,
    retry: RetryPolicy,
    reconnects: u64,
}

impl<S: TradeSource> TradeRecords<S> {
    pub(crate) const fn new(trades: S, retry: RetryPolicy) -> Self {
        Self {
            trades,
            retry,
            reconnects: 0,
        }
    }

    pub(crate) const fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub(crate) fn rejected_trades(&self) -> u64 {
        self.trades.rejected_trades()
    }

    async fn recover(&mut self, error: CandelaError) -> candela_lib::Result<()> {
        warn!(error = %error, "trade feed failed, reconnecting");
        let mut last = error;
        for attempt in 0..self.retry.max_retries {
            tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
            match self.trades.reconnect().await {
                Ok(()) => {
                    self.reconnects += 1;
                    info!(attempt = attempt + 1, "reconnected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "reconnect failed");
                    last = e;
                }
            }
        }
        Err(last)
    }
}

#[async_trait]
impl<S: TradeSource> RecordSource for TradeRecords<S> {
    async fn next_batch(&mut self) -> candela_lib::Result<Vec<Record>> {
        match self.trades.get_trades().await {
            Ok(trades) => trades.iter().map(to_record).collect(),
            Err(e) if e.is_transport() => {
                self.recover(e).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn is_done(&self) -> bool {
        self.trades.is_done()
    }

    async fn commit(&mut self) -> candela_lib::Result<()> {
        self.trades.commit(None).await
    }
}
