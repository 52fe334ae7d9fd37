//! Pull-based source capabilities.

use async_trait::async_trait;
use candela_types::{CandelaError, Record, Result, Trade};

/// A source of trade batches.
///
/// The live and historical variants share this interface so a driver can
/// select one at startup and run the same loop over either.
#[async_trait]
pub trait TradeSource: Send {
    /// Returns the next available batch of trades, possibly empty.
    ///
    /// Trades within one batch are non-decreasing in event time.
    async fn get_trades(&mut self) -> Result<Vec<Trade>>;

    /// Returns true once the source has nothing more to deliver.
    ///
    /// Live sources never finish.
    fn is_done(&self) -> bool;

    /// Returns the number of incoming trades rejected at the boundary so far.
    fn rejected_trades(&self) -> u64 {
        0
    }

    /// Reopens the underlying connection after a transport error.
    async fn reconnect(&mut self) -> Result<()> {
        Err(CandelaError::Transport(
            "source does not support reconnecting".to_string(),
        ))
    }

    /// Acknowledges the trades returned so far as handled downstream.
    ///
    /// Trades with an event time at or after `keep_from_ms` belong to a
    /// window that has not been emitted yet; a replayable source must deliver
    /// them again after a restart. `None` acknowledges everything.
    async fn commit(&mut self, keep_from_ms: Option<i64>) -> Result<()> {
        let _ = keep_from_ms;
        Ok(())
    }

    /// Closes the underlying connection.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A source of raw records that bypass aggregation.
#[async_trait]
pub trait RecordSource: Send {
    /// Returns the next available batch of records, possibly empty.
    async fn next_batch(&mut self) -> Result<Vec<Record>>;

    /// Returns true once the source has nothing more to deliver.
    fn is_done(&self) -> bool;

    /// Acknowledges everything returned so far as handled downstream.
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: TradeSource + ?Sized> TradeSource for Box<T> {
    async fn get_trades(&mut self) -> Result<Vec<Trade>> {
        (**self).get_trades().await
    }

    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn rejected_trades(&self) -> u64 {
        (**self).rejected_trades()
    }

    async fn reconnect(&mut self) -> Result<()> {
        (**self).reconnect().await
    }

    async fn commit(&mut self, keep_from_ms: Option<i64>) -> Result<()> {
        (**self).commit(keep_from_ms).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<T: RecordSource + ?Sized> RecordSource for Box<T> {
    async fn next_batch(&mut self) -> Result<Vec<Record>> {
        (**self).next_batch().await
    }

    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    async fn commit(&mut self) -> Result<()> {
        (**self).commit().await
    }
}
