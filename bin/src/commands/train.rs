//! Train command: score the baseline on stored candles.

use anyhow::{Context, Result};
use candela_lib::{
    CurrentPriceBaseline, LocalFeatureStore, TimeRange, TrainConfig, evaluate, rows_from_records,
};
use clap::Args;
use tracing::info;

use crate::args::StoreArgs;

/// Arguments of the `train` command.
#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    #[command(flatten)]
    pub(crate) store: StoreArgs,

    /// Instrument whose candles are used
    #[arg(long, env = "PRODUCT_ID", default_value = "BTC/USD")]
    pub(crate) instrument: String,

    /// Only use candles from the last N days
    #[arg(long, env = "LAST_N_DAYS")]
    pub(crate) lookback_days: Option<u32>,

    /// How many candles ahead the target close lies
    #[arg(long, env = "FORECAST_STEPS", default_value_t = 1)]
    pub(crate) forecast_steps: usize,

    /// Share of the most recent candles held out for testing
    #[arg(long, default_value_t = 0.3)]
    pub(crate) test_fraction: f64,

    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn train(args: &TrainArgs) -> Result<()> {
    let group = args.store.group();
    let store = LocalFeatureStore::new(&args.store.store_dir);
    let records = store
        .read_online(&group)
        .with_context(|| format!("Failed to read feature group {group}"))?;

    let since_ms = args
        .lookback_days
        .map(|days| TimeRange::last_days(days, chrono::Utc::now()))
        .transpose()?
        .map(|range| range.start_ms);
    let rows = rows_from_records(&records, &args.instrument, since_ms)?;
    info!(%group, instrument = %args.instrument, rows = rows.len(), "loaded candles");

    let config = TrainConfig::default()
        .with_forecast_steps(args.forecast_steps)
        .with_test_fraction(args.test_fraction);
    let mut model = CurrentPriceBaseline;
    let report = evaluate(&mut model, &rows, &config)
        .with_context(|| format!("Cannot evaluate {} on {} candles", args.instrument, rows.len()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Model:        {}", report.model);
        println!("Instrument:   {}", args.instrument);
        println!("Candles:      {}", report.rows);
        println!("Train rows:   {}", report.train_rows);
        println!("Test rows:    {}", report.test_rows);
        println!("Test MAE:     {:.6}", report.mae);
    }
    Ok(())
}
