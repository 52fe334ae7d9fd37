//! Aggregate command: trade topic to candle topic.

use std::time::Duration;

use anyhow::Result;
use candela_lib::{CandlePipeline, PipelineConfig, RunSummary, TopicTradeSource};
use clap::Args;
use tracing::info;

use super::shutdown_signal;
use crate::args::{BrokerArgs, WindowArgs};

/// Arguments of the `aggregate` command.
#[derive(Args, Debug)]
pub(crate) struct AggregateArgs {
    #[command(flatten)]
    pub(crate) broker: BrokerArgs,

    #[command(flatten)]
    pub(crate) window: WindowArgs,

    /// Instrument to aggregate; trades for other instruments are skipped
    #[arg(long, env = "PRODUCT_ID", default_value = "BTC/USD")]
    pub(crate) instrument: String,

    /// Topic the trades are read from
    #[arg(long, env = "KAFKA_INPUT_TOPIC", default_value = "trades")]
    pub(crate) input_topic: String,

    /// Topic the candles are written to
    #[arg(long, env = "KAFKA_OUTPUT_TOPIC", default_value = "candles")]
    pub(crate) output_topic: String,

    /// Consumer group whose offset is committed
    #[arg(long, env = "KAFKA_CONSUMER_GROUP", default_value = "trade-to-ohlc")]
    pub(crate) consumer_group: String,

    /// Wait between polls of an idle topic (ms)
    #[arg(long, env = "CANDELA_POLL_INTERVAL_MS", default_value_t = 500)]
    pub(crate) poll_interval_ms: u64,

    /// Finish once the input topic has no new entries
    #[arg(long)]
    pub(crate) stop_when_idle: bool,
}

pub(crate) async fn aggregate(args: AggregateArgs) -> Result<RunSummary> {
    let broker = args.broker.open()?;
    let consumer = broker
        .consumer(&args.input_topic, &args.consumer_group)
        .await?
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms))
        .with_stop_when_idle(args.stop_when_idle);
    let producer = broker.producer(&args.output_topic).await?;
    let source = TopicTradeSource::new(consumer).for_instrument(&args.instrument);

    info!(
        instrument = %args.instrument,
        window = %args.window.window,
        input = %args.input_topic,
        output = %args.output_topic,
        group = %args.consumer_group,
        "aggregating trades"
    );
    let config = args.window.apply(PipelineConfig::default());
    let mut pipeline =
        CandlePipeline::new(source, &args.instrument, config).with_publisher(Box::new(producer));
    Ok(pipeline.run(shutdown_signal()).await?)
}
