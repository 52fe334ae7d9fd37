//! To-store command: candle topic to the feature store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use candela_lib::{LocalFeatureStore, RecordPipeline, RunSummary, WindowDuration};
use clap::Args;
use tracing::info;

use super::shutdown_signal;
use crate::args::{BatchArgs, BrokerArgs, StoreArgs};

/// Arguments of the `to-store` command.
#[derive(Args, Debug)]
pub(crate) struct ToStoreArgs {
    #[command(flatten)]
    pub(crate) broker: BrokerArgs,

    #[command(flatten)]
    pub(crate) store: StoreArgs,

    #[command(flatten)]
    pub(crate) batch: BatchArgs,

    /// Topic the candles are read from
    #[arg(long, env = "KAFKA_INPUT_TOPIC", default_value = "candles")]
    pub(crate) input_topic: String,

    /// Consumer group whose offset is committed
    #[arg(long, env = "KAFKA_CONSUMER_GROUP", default_value = "ohlc-to-feature-store")]
    pub(crate) consumer_group: String,

    /// Wait between polls of an idle topic (ms)
    #[arg(long, env = "CANDELA_POLL_INTERVAL_MS", default_value_t = 500)]
    pub(crate) poll_interval_ms: u64,

    /// Finish once the input topic has no new entries
    #[arg(long)]
    pub(crate) stop_when_idle: bool,
}

pub(crate) async fn to_store(args: ToStoreArgs) -> Result<RunSummary> {
    let consumer = args
        .broker
        .open()?
        .consumer(&args.input_topic, &args.consumer_group)
        .await?
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_stop_when_idle(args.stop_when_idle);
    let group = args.store.group();
    let store = Arc::new(LocalFeatureStore::new(&args.store.store_dir));

    info!(
        input = %args.input_topic,
        consumer_group = %args.consumer_group,
        feature_group = %group,
        store = %args.store.store_dir.display(),
        "writing candles to the feature store"
    );
    let config = args.batch.pipeline_config(WindowDuration::ONE_MINUTE);
    let mut pipeline = RecordPipeline::new(consumer, config).with_store(store, group);
    Ok(pipeline.run(shutdown_signal()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_lib::{Broker, FeatureGroup, Record};
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ToStoreArgs,
    }

    fn candle(timestamp_ms: i64, close: f64) -> Record {
        let value = json!({
            "product_id": "BTC/USD",
            "timestamp_ms": timestamp_ms,
            "open": close,
            "high": close,
            "low": close,
            "close": close,
            "volume": 1.0,
        });
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_to_store_drains_topic() {
        let dir = tempfile::tempdir().unwrap();
        let broker_dir = dir.path().join("broker");
        let store_dir = dir.path().join("store");

        let broker = Broker::new(&broker_dir).unwrap();
        let mut producer = broker.producer("candles").await.unwrap();
        for (i, close) in [100.0, 101.0, 102.0].into_iter().enumerate() {
            producer
                .send("BTC/USD", &candle(60_000 * i as i64, close))
                .await
                .unwrap();
        }

        let cli = TestCli::parse_from([
            "candela",
            "--broker",
            broker_dir.to_str().unwrap(),
            "--store-dir",
            store_dir.to_str().unwrap(),
            "--batch-size",
            "2",
            "--poll-interval-ms",
            "10",
            "--stop-when-idle",
        ]);
        let summary = to_store(cli.args).await.unwrap();
        assert_eq!(summary.records_received, 3);
        assert_eq!(summary.records_flushed, 3);
        assert_eq!(summary.records_discarded, 0);

        let group = FeatureGroup::new("ohlcv", 1)
            .with_primary_keys(["product_id", "timestamp_ms"])
            .with_event_time_field("timestamp_ms");
        let stored = LocalFeatureStore::new(&store_dir).read_online(&group).unwrap();
        assert_eq!(stored.len(), 3);
    }
}
