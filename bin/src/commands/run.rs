//! Run command: trades to candles to the feature store in one process.

use std::sync::Arc;

use anyhow::Result;
use candela_lib::{CandlePipeline, LocalFeatureStore, RunSummary};
use clap::Args;
use tracing::info;

use super::{open_trade_source, shutdown_signal};
use crate::args::{BatchArgs, BrokerArgs, SourceArgs, StoreArgs, WindowArgs};

/// Arguments of the `run` command.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,

    #[command(flatten)]
    pub(crate) window: WindowArgs,

    #[command(flatten)]
    pub(crate) store: StoreArgs,

    #[command(flatten)]
    pub(crate) batch: BatchArgs,

    #[command(flatten)]
    pub(crate) broker: BrokerArgs,

    /// Also publish every candle to this topic
    #[arg(long, env = "KAFKA_OUTPUT_TOPIC")]
    pub(crate) output_topic: Option<String>,
}

pub(crate) async fn run(args: RunArgs, quiet: bool) -> Result<RunSummary> {
    let config = args.window.apply(
        args.batch
            .pipeline_config(args.window.window)
            .with_reconnect_retry(args.source.reconnect_retry()),
    );
    let group = args.store.group();
    let store = Arc::new(LocalFeatureStore::new(&args.store.store_dir));
    let source = open_trade_source(&args.source, quiet).await?;

    let mut pipeline = CandlePipeline::new(source, &args.source.instrument, config)
        .with_store(store, group.clone());
    if let Some(topic) = &args.output_topic {
        let producer = args.broker.open()?.producer(topic).await?;
        pipeline = pipeline.with_publisher(Box::new(producer));
    }

    info!(
        instrument = %args.source.instrument,
        window = %args.window.window,
        %group,
        store = %args.store.store_dir.display(),
        "running candle pipeline"
    );
    Ok(pipeline.run(shutdown_signal()).await?)
}
