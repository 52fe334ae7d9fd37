//! Bounded historical replay.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use candela_types::{CandelaError, Result, TimeRange, Trade};
use tracing::{info, warn};

use crate::{TradeHistory, TradeSource};

/// Default number of trades served per `get_trades` call.
const DEFAULT_SLICE_LEN: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Replays the trades of one instrument over a bounded time range.
///
/// The history is queried once, on the first call. Trades are filtered to the
/// instrument and range, stably sorted by event time, and served in slices
/// until exhausted.
#[derive(Debug)]
pub struct HistoricalSource<H> {
    history: H,
    instrument_id: String,
    range: TimeRange,
    slice_len: NonZeroUsize,
    pending: Option<VecDeque<Trade>>,
    served: usize,
    rejected: u64,
}

impl<H: TradeHistory> HistoricalSource<H> {
    /// Creates a replay over `history` for the given instrument and range.
    #[must_use]
    pub fn new(history: H, instrument_id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            history,
            instrument_id: instrument_id.into(),
            range,
            slice_len: DEFAULT_SLICE_LEN,
            pending: None,
            served: 0,
            rejected: 0,
        }
    }

    /// Sets the number of trades served per call.
    #[must_use]
    pub const fn with_slice_len(mut self, slice_len: NonZeroUsize) -> Self {
        self.slice_len = slice_len;
        self
    }

    /// Returns the replayed range.
    #[must_use]
    pub const fn range(&self) -> TimeRange {
        self.range
    }

    /// Returns the number of trades served so far.
    #[must_use]
    pub const fn served(&self) -> usize {
        self.served
    }

    /// Returns the number of trades still queued, if the history was loaded.
    #[must_use]
    pub fn remaining(&self) -> Option<usize> {
        self.pending.as_ref().map(VecDeque::len)
    }

    async fn load(&mut self) -> Result<VecDeque<Trade>> {
        let entries = self
            .history
            .fetch(&self.instrument_id, self.range)
            .await
            .map_err(|e| CandelaError::Query(e.to_string()))?;

        let mut trades = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Ok(trade)
                    if trade.instrument_id() == self.instrument_id
                        && self.range.contains(trade.event_time_ms()) =>
                {
                    trades.push(trade);
                }
                Ok(_) => {}
                Err(e) => {
                    self.rejected += 1;
                    warn!(error = %e, "dropping invalid historical trade");
                }
            }
        }
        trades.sort_by_key(Trade::event_time_ms);

        info!(
            instrument = %self.instrument_id,
            range = %self.range,
            trades = trades.len(),
            rejected = self.rejected,
            "historical replay loaded"
        );
        Ok(trades.into())
    }
}

#[async_trait]
impl<H: TradeHistory> TradeSource for HistoricalSource<H> {
    async fn get_trades(&mut self) -> Result<Vec<Trade>> {
        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None => self.load().await?,
        };

        let n = pending.len().min(self.slice_len.get());
        let slice: Vec<Trade> = pending.drain(..n).collect();
        self.served += slice.len();
        self.pending = Some(pending);
        Ok(slice)
    }

    fn is_done(&self) -> bool {
        self.pending.as_ref().is_some_and(VecDeque::is_empty)
    }

    fn rejected_trades(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;
    use candela_types::DataShapeError;

    struct FixedHistory(Vec<std::result::Result<Trade, DataShapeError>>);

    #[async_trait]
    impl TradeHistory for FixedHistory {
        async fn fetch(
            &self,
            _instrument_id: &str,
            _range: TimeRange,
        ) -> std::result::Result<Vec<std::result::Result<Trade, DataShapeError>>, TransportError>
        {
            Ok(self.0.clone())
        }
    }

    struct FailingHistory;

    #[async_trait]
    impl TradeHistory for FailingHistory {
        async fn fetch(
            &self,
            _instrument_id: &str,
            _range: TimeRange,
        ) -> std::result::Result<Vec<std::result::Result<Trade, DataShapeError>>, TransportError>
        {
            Err(TransportError::ServerError { status: 503 })
        }
    }

    fn trade(id: &str, ms: i64, price: f64) -> std::result::Result<Trade, DataShapeError> {
        Ok(Trade::new(id, price, 1.0, ms).unwrap())
    }

    #[tokio::test]
    async fn test_sorted_slices_until_done() {
        let history = FixedHistory(vec![
            trade("BTC/USD", 300, 3.0),
            trade("BTC/USD", 100, 1.0),
            trade("BTC/USD", 200, 2.0),
            trade("BTC/USD", 100, 1.5),
            trade("ETH/USD", 150, 9.0),
            trade("BTC/USD", 5_000, 9.0),
            Err(DataShapeError::NonPositivePrice(0.0)),
        ]);
        let range = TimeRange::new(0, 1_000).unwrap();
        let mut source = HistoricalSource::new(history, "BTC/USD", range)
            .with_slice_len(NonZeroUsize::new(3).unwrap());

        assert!(!source.is_done());
        let first = source.get_trades().await.unwrap();
        let times: Vec<i64> = first.iter().map(Trade::event_time_ms).collect();
        assert_eq!(times, vec![100, 100, 200]);
        // Stable sort keeps arrival order for equal event times.
        assert!((first[0].price() - 1.0).abs() < 1e-12);
        assert!((first[1].price() - 1.5).abs() < 1e-12);
        assert!(!source.is_done());

        let second = source.get_trades().await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(source.is_done());
        assert_eq!(source.served(), 4);
        assert_eq!(source.rejected_trades(), 1);

        assert!(source.get_trades().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_history_is_done_after_first_call() {
        let range = TimeRange::new(0, 1_000).unwrap();
        let mut source = HistoricalSource::new(FixedHistory(Vec::new()), "BTC/USD", range);
        assert!(source.get_trades().await.unwrap().is_empty());
        assert!(source.is_done());
        assert_eq!(source.remaining(), Some(0));
    }

    #[tokio::test]
    async fn test_query_failure_is_not_transport() {
        let range = TimeRange::new(0, 1_000).unwrap();
        let mut source = HistoricalSource::new(FailingHistory, "BTC/USD", range);
        let err = source.get_trades().await.unwrap_err();
        assert!(matches!(err, CandelaError::Query(_)));
        assert!(!source.is_done());
    }
}
