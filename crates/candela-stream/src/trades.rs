//! Trades read back from a topic.

use async_trait::async_trait;
use candela_source::TradeSource;
use candela_types::{RawTrade, Result, Trade};
use serde_json::Value;
use tracing::warn;

use crate::TopicConsumer;

/// Adapts a [`TopicConsumer`] of raw trade records into a [`TradeSource`].
///
/// Each entry is validated at the boundary; invalid ones are counted and
/// skipped. Entries for other instruments are ignored when an instrument
/// filter is set.
///
/// The source remembers where every uncommitted trade starts in the topic,
/// so a commit that keeps an open window stops at that window's first entry.
#[derive(Debug)]
pub struct TopicTradeSource {
    consumer: TopicConsumer,
    instrument_id: Option<String>,
    rejected: u64,
    /// `(event_time_ms, offset)` of trades returned since the last full commit.
    uncommitted: Vec<(i64, u64)>,
}

impl TopicTradeSource {
    /// Wraps a consumer.
    #[must_use]
    pub const fn new(consumer: TopicConsumer) -> Self {
        Self {
            consumer,
            instrument_id: None,
            rejected: 0,
            uncommitted: Vec::new(),
        }
    }

    /// Only yields trades of `instrument_id`.
    #[must_use]
    pub fn for_instrument(mut self, instrument_id: impl Into<String>) -> Self {
        self.instrument_id = Some(instrument_id.into());
        self
    }

    /// Returns the underlying consumer.
    #[must_use]
    pub const fn consumer(&self) -> &TopicConsumer {
        &self.consumer
    }

    fn parse(&mut self, value: Value) -> Option<Trade> {
        let parsed = serde_json::from_value::<RawTrade>(value)
            .map_err(|e| e.to_string())
            .and_then(|raw| raw.validate().map_err(|e| e.to_string()));
        match parsed {
            Ok(trade) => Some(trade),
            Err(e) => {
                self.rejected += 1;
                warn!(topic = %self.consumer.topic(), error = %e, "dropping invalid trade entry");
                None
            }
        }
    }
}

#[async_trait]
impl TradeSource for TopicTradeSource {
    async fn get_trades(&mut self) -> Result<Vec<Trade>> {
        let entries = self.consumer.poll_with_offsets().await?;
        let mut trades = Vec::with_capacity(entries.len());
        for (offset, entry) in entries {
            let Some(trade) = self.parse(Value::Object(entry.value)) else {
                continue;
            };
            if self
                .instrument_id
                .as_deref()
                .is_none_or(|id| id == trade.instrument_id())
            {
                self.uncommitted.push((trade.event_time_ms(), offset));
                trades.push(trade);
            }
        }
        trades.sort_by_key(Trade::event_time_ms);
        Ok(trades)
    }

    fn is_done(&self) -> bool {
        candela_source::RecordSource::is_done(&self.consumer)
    }

    fn rejected_trades(&self) -> u64 {
        self.rejected
    }

    async fn commit(&mut self, keep_from_ms: Option<i64>) -> Result<()> {
        let keep_offset = keep_from_ms.and_then(|keep_from| {
            self.uncommitted
                .iter()
                .filter(|(event_time_ms, _)| *event_time_ms >= keep_from)
                .map(|(_, offset)| *offset)
                .min()
        });
        match keep_offset {
            Some(offset) => {
                self.consumer.commit_to(offset).await?;
                self.uncommitted.retain(|(_, o)| *o >= offset);
            }
            None => {
                self.consumer.commit().await?;
                self.uncommitted.clear();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Broker;
    use candela_types::{Record, to_record};
    use serde_json::json;
    use std::time::Duration;

    fn raw(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_reads_validated_sorted_trades() {
        let dir = tempfile::tempdir().unwrap();
        let broker = Broker::new(dir.path()).unwrap();
        let mut producer = broker.producer("trades").await.unwrap();

        let later = Trade::new("BTC/USD", 101.0, 1.0, 2_000).unwrap();
        let earlier = Trade::new("BTC/USD", 100.0, 2.0, 1_000).unwrap();
        producer
            .send("BTC/USD", &to_record(&later).unwrap())
            .await
            .unwrap();
        producer
            .send("BTC/USD", &to_record(&earlier).unwrap())
            .await
            .unwrap();
        producer
            .send(
                "BTC/USD",
                &raw(json!({"product_id": "BTC/USD", "price": -1.0, "quantity": 1.0, "timestamp_ms": 5})),
            )
            .await
            .unwrap();
        producer
            .send(
                "ETH/USD",
                &to_record(&Trade::new("ETH/USD", 9.0, 1.0, 1_500).unwrap()).unwrap(),
            )
            .await
            .unwrap();

        let consumer = broker
            .consumer("trades", "ohlc")
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
            .with_stop_when_idle(true);
        let mut source = TopicTradeSource::new(consumer).for_instrument("BTC/USD");

        let trades = source.get_trades().await.unwrap();
        assert_eq!(trades, vec![earlier, later]);
        assert_eq!(source.rejected_trades(), 1);
        assert!(!source.is_done());

        assert!(source.get_trades().await.unwrap().is_empty());
        assert!(source.is_done());

        source.commit(None).await.unwrap();
        assert_eq!(source.consumer().committed(), source.consumer().position());
    }

    async fn consumer(broker: &Broker) -> TopicConsumer {
        broker
            .consumer("trades", "ohlc")
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_commit_keeps_open_window_entries() {
        let dir = tempfile::tempdir().unwrap();
        let broker = Broker::new(dir.path()).unwrap();
        let mut producer = broker.producer("trades").await.unwrap();
        for (secs, price) in [(0, 100.0), (12, 101.0), (5, 99.0), (15, 102.0)] {
            let trade = Trade::new("BTC/USD", price, 1.0, secs * 1000).unwrap();
            producer
                .send("BTC/USD", &to_record(&trade).unwrap())
                .await
                .unwrap();
        }

        let mut source = TopicTradeSource::new(consumer(&broker).await);
        assert_eq!(source.get_trades().await.unwrap().len(), 4);

        // The window from 10s is still open: the commit stops at its first
        // entry, the trade at 12s, even though a trade at 5s follows it.
        source.commit(Some(10_000)).await.unwrap();
        assert!(source.consumer().committed() > 0);
        assert!(source.consumer().committed() < source.consumer().position());

        let mut resumed = TopicTradeSource::new(consumer(&broker).await);
        let times: Vec<i64> = resumed
            .get_trades()
            .await
            .unwrap()
            .iter()
            .map(Trade::event_time_ms)
            .collect();
        assert_eq!(times, vec![5_000, 12_000, 15_000]);

        // Once nothing is held back, everything is acknowledged.
        source.commit(None).await.unwrap();
        assert_eq!(source.consumer().committed(), source.consumer().position());
    }
}
