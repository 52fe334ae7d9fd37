//! candela CLI - Streaming trade-to-OHLCV candle pipeline.

use anyhow::{Result, bail};
use candela_lib::RunSummary;
use clap::{CommandFactory, Parser, Subcommand};

mod args;
mod commands;
mod logging;
mod progress;

use commands::aggregate::AggregateArgs;
use commands::produce::ProduceArgs;
use commands::run::RunArgs;
use commands::to_store::ToStoreArgs;
use commands::train::TrainArgs;

#[derive(Parser)]
#[command(name = "candela")]
#[command(about = "Streaming trade-to-OHLCV candle pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output and info logs)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "CANDELA_LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a trade feed into candles and write them to the feature store
    Run(RunArgs),

    /// Write a trade feed to a topic
    Produce(ProduceArgs),

    /// Aggregate a trade topic into a candle topic
    Aggregate(AggregateArgs),

    /// Write a candle topic to the feature store
    ToStore(ToStoreArgs),

    /// Score the current-price baseline on stored candles
    Train(TrainArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet, cli.log_json);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let hide_progress = cli.quiet || cli.log_json;
    let summary = match command {
        Commands::Run(args) => commands::run::run(args, hide_progress).await?,
        Commands::Produce(args) => commands::produce::produce(args, hide_progress).await?,
        Commands::Aggregate(args) => commands::aggregate::aggregate(args).await?,
        Commands::ToStore(args) => commands::to_store::to_store(args).await?,
        Commands::Train(args) => return commands::train::train(&args),
    };
    check(&summary)
}

/// Fails the process if buffered records were lost on shutdown.
fn check(summary: &RunSummary) -> Result<()> {
    if summary.records_discarded > 0 {
        bail!(
            "{} buffered records could not be flushed before shutdown",
            summary.records_discarded
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_to_store() {
        let cli = Cli::parse_from([
            "candela",
            "-vv",
            "to-store",
            "--batch-size",
            "10",
            "--stop-when-idle",
        ]);
        assert_eq!(cli.verbose, 2);
        let Some(Commands::ToStore(args)) = cli.command else {
            panic!("expected to-store");
        };
        assert_eq!(args.input_topic, "candles");
        assert_eq!(args.consumer_group, "ohlc-to-feature-store");
        assert_eq!(args.batch.batch_size.get(), 10);
        assert!(args.stop_when_idle);
    }

    #[test]
    fn test_check_fails_on_discarded_records() {
        let mut summary = RunSummary::default();
        assert!(check(&summary).is_ok());
        summary.records_discarded = 2;
        assert!(check(&summary).is_err());
    }
}
