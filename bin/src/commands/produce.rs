//! Produce command: trade feed to a topic.

use anyhow::Result;
use candela_lib::{PipelineConfig, RecordPipeline, RunSummary};
use clap::Args;
use tracing::info;

use super::{TradeRecords, open_trade_source, shutdown_signal};
use crate::args::{BrokerArgs, SourceArgs};

/// Arguments of the `produce` command.
#[derive(Args, Debug)]
pub(crate) struct ProduceArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,

    #[command(flatten)]
    pub(crate) broker: BrokerArgs,

    /// Topic the trades are written to
    #[arg(long, env = "KAFKA_OUTPUT_TOPIC", default_value = "trades")]
    pub(crate) output_topic: String,
}

pub(crate) async fn produce(args: ProduceArgs, quiet: bool) -> Result<RunSummary> {
    let producer = args.broker.open()?.producer(&args.output_topic).await?;
    let trades = open_trade_source(&args.source, quiet).await?;
    let source = TradeRecords::new(trades, args.source.reconnect_retry());

    info!(
        instrument = %args.source.instrument,
        topic = %args.output_topic,
        "producing trades"
    );
    let mut pipeline =
        RecordPipeline::new(source, PipelineConfig::default()).with_publisher(Box::new(producer));
    let mut summary = pipeline.run(shutdown_signal()).await?;
    summary.trades_rejected = pipeline.source().rejected_trades();
    summary.reconnects = pipeline.source().reconnects();
    Ok(summary)
}
