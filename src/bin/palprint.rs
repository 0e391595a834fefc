//! `palprint` — parse a PAL pattern IR file and print what it contains.
//!
//! A quick lint for mined pattern files: every record that parses is
//! summarized on stdout, every record that does not produces a located
//! diagnostic on stderr. Exits nonzero when any diagnostic was emitted.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use palkit::patterns::{PalParseDriver, Side, VolatilityAttr};

#[derive(Parser, Debug)]
#[command(name = "palprint", about = "Parse and summarize a PAL pattern IR file")]
struct Args {
    /// Pattern IR file to parse.
    ir_file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut driver = PalParseDriver::new();
    driver.parse_file(&args.ir_file)?;

    for pattern in driver.patterns() {
        let side = match pattern.entry.side {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        };
        let vol = match pattern.volatility {
            VolatilityAttr::None => String::new(),
            other => format!(" vol={other:?}"),
        };
        println!(
            "index {:>5}  {}  {} comparison(s), max offset {}, target {}%, stop {}%{}",
            pattern.descriptor.index,
            side,
            pattern.condition.num_comparisons(),
            pattern.max_bar_offset(),
            pattern.target.pct,
            pattern.stop.pct,
            vol
        );
    }
    println!(
        "{} pattern(s): {} long, {} short",
        driver.patterns().len(),
        driver.long_patterns().count(),
        driver.short_patterns().count()
    );

    if !driver.diagnostics().is_empty() {
        for diag in driver.diagnostics() {
            eprintln!("{}: {diag}", args.ir_file.display());
        }
        bail!("{} record(s) failed to parse", driver.diagnostics().len());
    }
    Ok(())
}
