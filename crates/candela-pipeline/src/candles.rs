//! Trades to candles driver.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use candela_aggregate::{Candle, CandleAggregator};
use candela_sink::{BatchSink, FeatureGroup, FeatureStore, Publisher};
use candela_source::TradeSource;
use candela_types::{CandelaError, Trade, to_record};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::output::Output;
use crate::{PipelineConfig, PipelineError, RunSummary};

/// Drives a [`TradeSource`] through a [`CandleAggregator`] into a batch sink
/// and/or a publisher.
///
/// Runs until the source reports completion or the shutdown future resolves.
/// Transport errors discard the open window and reconnect the source within
/// the configured retry budget.
pub struct CandlePipeline<S> {
    source: S,
    aggregator: CandleAggregator,
    output: Output,
    config: PipelineConfig,
    summary: RunSummary,
}

impl<S: fmt::Debug> fmt::Debug for CandlePipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandlePipeline")
            .field("source", &self.source)
            .field("aggregator", &self.aggregator)
            .field("config", &self.config)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<S: TradeSource> CandlePipeline<S> {
    /// Creates a pipeline aggregating `instrument_id` trades from `source`.
    #[must_use]
    pub fn new(source: S, instrument_id: impl Into<String>, config: PipelineConfig) -> Self {
        Self {
            source,
            aggregator: CandleAggregator::new(instrument_id, config.window),
            output: Output::new(config.flush_retry),
            config,
            summary: RunSummary::default(),
        }
    }

    /// Buffers candles for `store` under `group`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn FeatureStore>, group: FeatureGroup) -> Self {
        let sink = BatchSink::new(store, group, self.config.batch_size)
            .with_materialize_offline(self.config.materialize_offline);
        self.output.set_sink(sink);
        self
    }

    /// Publishes every candle keyed by its instrument.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.output.set_publisher(publisher);
        self
    }

    /// Returns the source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &CandleAggregator {
        &self.aggregator
    }

    /// Returns the number of candles waiting for a flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.output.buffered()
    }

    /// Returns the counters collected so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = self.summary;
        let stats = self.aggregator.stats();
        summary.trades_accepted = stats.trades_accepted;
        summary.trades_rejected = self.source.rejected_trades() + stats.foreign_trades;
        summary.late_trades = stats.late_trades;
        summary.candles_emitted = stats.candles_emitted;
        summary
    }

    /// Runs until the source is exhausted or `shutdown` resolves.
    ///
    /// At end of stream the open window is emitted and the buffer flushed.
    /// On shutdown the open window is discarded and the buffer flushed on a
    /// best-effort basis. Commits never acknowledge trades of the open window,
    /// so a replayable source delivers them again after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails with a non-transport error,
    /// reconnecting exhausts its retries, a flush exhausts its retries, or a
    /// candle cannot be published.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        if !self.output.has_sink() && !self.output.has_publisher() {
            warn!("pipeline has no store or publisher, candles are only counted");
        }
        info!(
            instrument = %self.aggregator.instrument_id(),
            window = %self.config.window,
            batch_size = self.config.batch_size.get(),
            "candle pipeline started"
        );

        loop {
            if self.source.is_done() {
                self.finish().await?;
                break;
            }

            let polled = tokio::select! {
                biased;
                () = &mut shutdown => None,
                result = self.source.get_trades() => Some(result),
            };
            let Some(result) = polled else {
                self.stop().await;
                break;
            };

            match result {
                Ok(trades) => self.handle(&trades).await?,
                Err(e) if e.is_transport() => {
                    if !self.recover(e, shutdown.as_mut()).await? {
                        self.stop().await;
                        break;
                    }
                }
                Err(e) => return Err(PipelineError::Source(e)),
            }
        }

        let summary = self.summary();
        info!(%summary, "candle pipeline finished");
        Ok(summary)
    }

    async fn handle(&mut self, trades: &[Trade]) -> Result<(), PipelineError> {
        if !trades.is_empty() {
            debug!(trades = trades.len(), "processing batch");
        }
        for trade in trades {
            if let Some(candle) = self.aggregator.process(trade) {
                self.emit(candle).await?;
            }
        }
        if let Some(grace) = self.config.idle_grace {
            let now_ms = Utc::now().timestamp_millis();
            if let Some(candle) = self.aggregator.flush_idle(now_ms, grace) {
                debug!(window_end_ms = candle.window_end_ms(), "idle window closed");
                self.emit(candle).await?;
            }
        }
        if self.output.is_drained() {
            let keep_from_ms = self.aggregator.open_window().map(|bounds| bounds.start_ms);
            self.source
                .commit(keep_from_ms)
                .await
                .map_err(PipelineError::Commit)?;
        }
        Ok(())
    }

    async fn emit(&mut self, candle: Candle) -> Result<(), PipelineError> {
        if !candle.is_consistent() {
            self.summary.inconsistent_candles += 1;
            error!(?candle, "refusing to emit inconsistent candle");
            return Ok(());
        }
        info!(
            instrument = %candle.instrument_id(),
            window_end_ms = candle.window_end_ms(),
            open = candle.open(),
            high = candle.high(),
            low = candle.low(),
            close = candle.close(),
            volume = candle.volume(),
            "candle emitted"
        );
        let record = to_record(&candle).map_err(PipelineError::Publish)?;
        self.output
            .deliver(candle.instrument_id(), record, &mut self.summary)
            .await
    }

    async fn finish(&mut self) -> Result<(), PipelineError> {
        if let Some(candle) = self.aggregator.finish() {
            self.emit(candle).await?;
        }
        self.output.close(&mut self.summary).await?;
        self.source.commit(None).await.map_err(PipelineError::Commit)?;
        self.close_source().await;
        Ok(())
    }

    async fn stop(&mut self) {
        info!("shutdown requested");
        self.summary.stopped = true;
        let keep_from_ms = self.discard_open_window();
        if self.output.shutdown(&mut self.summary).await {
            if let Err(e) = self.source.commit(keep_from_ms).await {
                warn!(error = %e, "commit failed on shutdown");
            }
        }
        self.close_source().await;
    }

    /// Reconnects after a transport error.
    ///
    /// Returns `false` if shutdown was requested while reconnecting.
    async fn recover<F>(
        &mut self,
        error: CandelaError,
        mut shutdown: Pin<&mut F>,
    ) -> Result<bool, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        error!(error = %error, "transport error");
        self.discard_open_window();

        let policy = self.config.reconnect_retry;
        let mut last_error = error;
        for attempt in 0..policy.max_retries {
            let delay = policy.backoff_delay(attempt);
            let source = &mut self.source;
            let result = tokio::select! {
                biased;
                () = &mut shutdown => return Ok(false),
                result = async move {
                    tokio::time::sleep(delay).await;
                    source.reconnect().await
                } => result,
            };
            match result {
                Ok(()) => {
                    self.summary.reconnects += 1;
                    info!(attempt = attempt + 1, "source reconnected");
                    return Ok(true);
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        error = %e,
                        "reconnect failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(PipelineError::ReconnectExhausted {
            attempts: policy.max_retries,
            source: last_error,
        })
    }

    /// Drops the open window and returns its start.
    fn discard_open_window(&mut self) -> Option<i64> {
        let bounds = self.aggregator.discard_open_window()?;
        warn!(
            start_ms = bounds.start_ms,
            end_ms = bounds.end_ms,
            "discarding open window"
        );
        self.summary.open_window_discarded = true;
        Some(bounds.start_ms)
    }

    async fn close_source(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "failed to close source");
        }
    }
}
