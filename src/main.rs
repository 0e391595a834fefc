//! `palsetup` — prepare a validation run from a historical data file.
//!
//! Reads the raw series, finds the quantization clean start, splits the
//! usable history, computes robust stop/target statistics and emits the
//! artifact tree. `--stats-only` runs everything but writes nothing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use garde::Validate;
use tracing_subscriber::EnvFilter;

use palkit::data::FileFormat;
use palkit::num::Decimal;
use palkit::setup::{Indicator, SetupConfig, SetupEngine};
use palkit::timeseries::TimeFrame;

#[derive(Parser, Debug)]
#[command(
    name = "palsetup",
    about = "Prepare PAL validation data: clean-start detection, splits, robust stop/target widths"
)]
struct Args {
    /// Historical data file to process.
    datafile: PathBuf,

    /// Input format tag: 1=CSI, 2=CSI extended, 3=TradeStation, 4=Pinnacle,
    /// 5=PAL, 6=WealthLab.
    file_type: u32,

    /// Ticker symbol; defaults to the data file's stem.
    #[arg(long)]
    ticker: Option<String>,

    /// Time frame: daily, weekly, monthly, quarterly or intraday (or the
    /// first letter).
    #[arg(long, default_value = "daily")]
    time_frame: String,

    /// Bar spacing in minutes for intraday data.
    #[arg(long, default_value_t = 90)]
    intraday_minutes: u32,

    /// Percent of usable history for the in-sample segment.
    #[arg(long, default_value_t = 60.0)]
    in_sample_pct: f64,

    /// Percent of usable history for the out-of-sample segment.
    #[arg(long, default_value_t = 40.0)]
    out_of_sample_pct: f64,

    /// Percent of usable history withheld at the end.
    #[arg(long, default_value_t = 0.0)]
    reserved_pct: f64,

    /// Holding period in bars for the return distribution.
    #[arg(long, default_value_t = 1)]
    holding_period: u32,

    /// Exchange tick size; 0 infers the tick from the data.
    #[arg(long, default_value = "0.01")]
    tick: Decimal,

    /// Emit the in-sample file as indicator (IBS) values instead of raw OHLC.
    #[arg(long)]
    indicator: bool,

    /// Compute and print statistics without writing any files.
    #[arg(long)]
    stats_only: bool,

    /// Directory the artifact tree is created under.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let ticker = match &args.ticker {
        Some(t) => t.clone(),
        None => args
            .datafile
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.split('.').next().unwrap_or(s).to_string())
            .context("cannot derive a ticker from the data file name")?,
    };

    let mut config = SetupConfig::new(
        ticker,
        TimeFrame::parse(&args.time_frame)?,
        FileFormat::from_tag(args.file_type)?,
    );
    config.intraday_minutes = args.intraday_minutes;
    config.in_sample_pct = args.in_sample_pct;
    config.out_of_sample_pct = args.out_of_sample_pct;
    config.reserved_pct = args.reserved_pct;
    config.holding_period = args.holding_period;
    config.security_tick = args.tick;
    config.stats_only = args.stats_only;
    config.indicator = args.indicator.then_some(Indicator::Ibs);

    config
        .validate()
        .map_err(|report| anyhow::anyhow!("invalid configuration: {report}"))?;

    let engine = SetupEngine::new(config, args.output_dir.clone());
    let report = engine
        .run(&args.datafile)
        .with_context(|| format!("setup failed for {}", args.datafile.display()))?;

    print!("{}", report.summary());
    Ok(())
}
