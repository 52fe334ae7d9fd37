//! Run summary.

use std::fmt;

/// Counters reported at the end of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Trades folded into a window.
    pub trades_accepted: u64,
    /// Trades rejected at the source boundary.
    pub trades_rejected: u64,
    /// Trades dropped because their window had already closed.
    pub late_trades: u64,
    /// Candles emitted by the aggregator.
    pub candles_emitted: u64,
    /// Candles refused because `high < low` or the volume was negative.
    pub inconsistent_candles: u64,
    /// Records delivered by raw record pipelines.
    pub records_received: u64,
    /// Records published downstream.
    pub records_published: u64,
    /// Records written to the store.
    pub records_flushed: u64,
    /// Successful non-empty flushes.
    pub flush_count: u64,
    /// Buffered records dropped because the shutdown flush failed.
    pub records_discarded: u64,
    /// Reconnects after transport errors.
    pub reconnects: u64,
    /// True if an open window was dropped without being emitted.
    pub open_window_discarded: bool,
    /// True if the run was stopped by the shutdown signal.
    pub stopped: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trades accepted ({} rejected, {} late), {} candles, {} records flushed in {} batches",
            self.trades_accepted,
            self.trades_rejected,
            self.late_trades,
            self.candles_emitted,
            self.records_flushed,
            self.flush_count
        )?;
        if self.records_published > 0 {
            write!(f, ", {} published", self.records_published)?;
        }
        if self.inconsistent_candles > 0 {
            write!(f, ", {} inconsistent candles refused", self.inconsistent_candles)?;
        }
        if self.reconnects > 0 {
            write!(f, ", {} reconnects", self.reconnects)?;
        }
        if self.records_discarded > 0 {
            write!(f, ", {} records discarded", self.records_discarded)?;
        }
        if self.open_window_discarded {
            write!(f, ", open window discarded")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reports_refused_candles() {
        let mut summary = RunSummary {
            trades_accepted: 4,
            candles_emitted: 2,
            records_flushed: 2,
            flush_count: 1,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "4 trades accepted (0 rejected, 0 late), 2 candles, 2 records flushed in 1 batches"
        );

        summary.inconsistent_candles = 1;
        summary.open_window_discarded = true;
        assert!(
            summary
                .to_string()
                .ends_with(", 1 inconsistent candles refused, open window discarded")
        );
    }
}
