//! Progress reporting for bounded replays.

use async_trait::async_trait;
use candela_lib::{Result, TimeRange, Trade, TradeSource};
use indicatif::{ProgressBar, ProgressStyle};

/// Resolution of the replay progress bar.
const PROGRESS_STEPS: u64 = 1000;

/// Wraps a historical source and advances a progress bar by event time.
pub(crate) struct ProgressSource<S> {
    inner: S,
    range: TimeRange,
    bar: ProgressBar,
    trades: u64,
}

impl<S: TradeSource> ProgressSource<S> {
    pub(crate) fn new(inner: S, range: TimeRange, label: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(PROGRESS_STEPS);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_message(format!("{label} {range}"));
            pb
        };
        Self {
            inner,
            range,
            bar,
            trades: 0,
        }
    }

    fn position(&self, trade: &Trade) -> u64 {
        (self.range.progress(trade.event_time_ms()) * PROGRESS_STEPS as f64) as u64
    }
}

#[async_trait]
impl<S: TradeSource> TradeSource for ProgressSource<S> {
    async fn get_trades(&mut self) -> Result<Vec<Trade>> {
        let trades = self.inner.get_trades().await?;
        if let Some(last) = trades.last() {
            self.bar.set_position(self.position(last));
        }
        self.trades += trades.len() as u64;
        if self.inner.is_done() {
            self.bar
                .finish_with_message(format!("Replayed {} trades", self.trades));
        } else {
            self.bar.set_message(format!("{} trades", self.trades));
        }
        Ok(trades)
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn rejected_trades(&self) -> u64 {
        self.inner.rejected_trades()
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.inner.reconnect().await
    }

    async fn commit(&mut self, keep_from_ms: Option<i64>) -> Result<()> {
        self.inner.commit(keep_from_ms).await
    }

    async fn close(&mut self) -> Result<()> {
        self.bar.finish_and_clear();
        self.inner.close().await
    }
}
