//! Artifact emission: data files, target/stop files, the machine-readable
//! config manifest and the human-readable details report.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::data::writers::{write_series, write_series_with_indicator};
use crate::error::PalError;
use crate::num::Decimal;
use crate::setup::config::SetupConfig;
use crate::setup::directories::DirectoryLayout;
use crate::setup::engine::{Series, SideStatistics, SplitSeries, SpreadAnalysis, SpreadSummary};
use crate::setup::quantization::CleanStartResult;
use crate::timeseries::TimeFrame;

/// Target multipliers emitted per side: half, full and double width.
const TARGET_MULTIPLIERS: [(&str, &str); 3] = [("0_5", "0.5"), ("1_0", "1"), ("2_0", "2")];

fn manifest_date(ts: NaiveDateTime, intraday: bool) -> String {
    if intraday {
        ts.format("%Y%m%dT%H%M%S").to_string()
    } else {
        ts.format("%Y%m%d").to_string()
    }
}

/// Two CRLF-terminated decimal lines: target percent, then stop percent.
fn write_trs(path: &Path, target: Decimal, stop: Decimal) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "{target}\r\n{stop}\r\n")?;
    out.flush()
}

fn write_side_trs_files(
    dir: &Path,
    ticker: &str,
    side: &str,
    stats: &SideStatistics,
) -> io::Result<()> {
    for (suffix, factor) in TARGET_MULTIPLIERS {
        let factor: Decimal = factor.parse().expect("constant parses");
        write_trs(
            &dir.join(format!("{ticker}_{suffix}_{side}.TRS")),
            stats.profit_target * factor,
            stats.stop,
        )?;
    }
    Ok(())
}

/// One positional CSV record consumed by the downstream validator:
/// `symbol, IR-path, data-path, file-format, IS-start, IS-end, OOS-start,
/// OOS-end, time-frame`.
fn write_config_manifest(
    dir: &Path,
    config: &SetupConfig,
    in_sample: &Series,
    out_of_sample: &Series,
) -> Result<(), PalError> {
    let intraday = config.time_frame == TimeFrame::Intraday;
    let ticker = &config.ticker;
    let mut out = BufWriter::new(File::create(dir.join(format!("{ticker}_config.csv")))?);
    writeln!(
        out,
        "{ticker},./{ticker}_IR.txt,./{ticker}_ALL.txt,{},{},{},{},{},{}",
        config.manifest_format(),
        manifest_date(in_sample.first_timestamp()?, intraday),
        manifest_date(in_sample.last_timestamp()?, intraday),
        manifest_date(out_of_sample.first_timestamp()?, intraday),
        manifest_date(out_of_sample.last_timestamp()?, intraday),
        config.time_frame
    )?;
    out.flush()?;
    Ok(())
}

fn write_spread_section(
    out: &mut impl Write,
    name: &str,
    summary: Option<&SpreadSummary>,
) -> io::Result<()> {
    match summary {
        Some(s) => {
            writeln!(out, "\n{name} Spread Estimator:")?;
            writeln!(out, "  Calculated {} spread measurements", s.count)?;
            writeln!(out, "  Mean: {}%", s.mean * Decimal::ONE_HUNDRED)?;
            writeln!(out, "  Median: {}%", s.median * Decimal::ONE_HUNDRED)?;
            writeln!(out, "  Robust Qn: {}%", s.qn * Decimal::ONE_HUNDRED)?;
        }
        None => {
            writeln!(out, "\n{name}: No valid spread calculations could be performed")?;
        }
    }
    Ok(())
}

fn side_profitability(stats: &SideStatistics) -> Option<Decimal> {
    if stats.stop.is_zero() {
        return None;
    }
    // Profitability = 100 * PF / (PF + R) with PF = 2 and R = target/stop.
    let ratio = stats.profit_target / stats.stop;
    Some(Decimal::ONE_HUNDRED * Decimal::TWO / (Decimal::TWO + ratio))
}

#[allow(clippy::too_many_lines)]
fn write_details_file(
    dir: &Path,
    config: &SetupConfig,
    split: &SplitSeries,
    long: &SideStatistics,
    short: &SideStatistics,
    clean_start: &CleanStartResult,
    spreads: &SpreadAnalysis,
) -> Result<(), PalError> {
    let intraday = config.time_frame == TimeFrame::Intraday;
    let path = dir.join(format!("{}_Palsetup_Details.txt", config.ticker));
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "In-sample% = {}%", config.in_sample_pct)?;
    writeln!(out, "Out-of-sample% = {}%", config.out_of_sample_pct)?;
    writeln!(out, "Reserved% = {}%", config.reserved_pct)?;

    writeln!(out, "\n=== Date Ranges ===")?;
    writeln!(
        out,
        "In-sample: {} to {}",
        manifest_date(split.in_sample.first_timestamp()?, intraday),
        manifest_date(split.in_sample.last_timestamp()?, intraday)
    )?;
    writeln!(
        out,
        "Out-of-sample: {} to {}",
        manifest_date(split.out_of_sample.first_timestamp()?, intraday),
        manifest_date(split.out_of_sample.last_timestamp()?, intraday)
    )?;
    if !split.reserved.is_empty() {
        writeln!(
            out,
            "Reserved: {} to {}",
            manifest_date(split.reserved.first_timestamp()?, intraday),
            manifest_date(split.reserved.last_timestamp()?, intraday)
        )?;
    }

    writeln!(out, "\n=== Long Position Statistics ===")?;
    if let Some(p) = side_profitability(long) {
        writeln!(out, "Long Profitability = {p}%")?;
    }
    writeln!(out, "Long Profit Target = {}", long.profit_target)?;
    writeln!(out, "Long Stop = {}", long.stop)?;
    writeln!(out, "Long Pos Median = {}", long.pos_median)?;
    writeln!(out, "Long Pos Qn = {}", long.pos_qn)?;
    writeln!(out, "Long Pos Skew = {}", long.pos_skew)?;
    writeln!(out, "Long Neg Median = {}", long.neg_median)?;
    writeln!(out, "Long Neg Skew = {}", long.neg_skew)?;
    writeln!(out, "Long Pos Count = {}", long.pos_count)?;
    writeln!(out, "Long Neg Count = {}", long.neg_count)?;

    writeln!(out, "\n=== Short Position Statistics ===")?;
    if let Some(p) = side_profitability(short) {
        writeln!(out, "Short Profitability = {p}%")?;
    }
    writeln!(out, "Short Profit Target = {}", short.profit_target)?;
    writeln!(out, "Short Stop = {}", short.stop)?;
    writeln!(out, "Short Neg Median = {}", short.neg_median)?;
    writeln!(out, "Short Neg Qn = {}", short.neg_qn)?;
    writeln!(out, "Short Neg Skew = {}", short.neg_skew)?;
    writeln!(out, "Short Pos Median = {}", short.pos_median)?;
    writeln!(out, "Short Pos Skew = {}", short.pos_skew)?;
    writeln!(out, "Short Neg Count = {}", short.neg_count)?;
    writeln!(out, "Short Pos Count = {}", short.pos_count)?;

    writeln!(out, "\n=== Clean Start Information ===")?;
    writeln!(out, "CleanStartIndex = {}", clean_start.start_index)?;
    if clean_start.found {
        writeln!(out, "InferredTick   = {}", clean_start.effective_tick)?;
        writeln!(out, "RelTick        = {}", clean_start.rel_tick)?;
        writeln!(out, "ZeroFrac       = {}", clean_start.zero_fraction)?;
        let source = if config.security_tick > Decimal::ZERO {
            "SecurityAttributes_or_CLI"
        } else {
            "Inferred"
        };
        writeln!(out, "TickSource     = {source}")?;
    }

    writeln!(out, "\n=== Bid/Ask Spread Analysis (Out-of-Sample) ===")?;
    writeln!(out, "Out-of-sample entries: {}", spreads.oos_entries)?;
    if spreads.oos_entries < 2 {
        writeln!(
            out,
            "Warning: Insufficient data for bid/ask spread calculation (need at least 2 entries)"
        )?;
    } else {
        write_spread_section(&mut out, "Corwin-Schultz", spreads.corwin_schultz.as_ref())?;
        write_spread_section(&mut out, "Edge (30-day window)", spreads.edge.as_ref())?;
        writeln!(out, "\n(Note: Current slippage estimate assumption: 0.10%)")?;
    }
    writeln!(out, "=== End Bid/Ask Spread Analysis ===")?;

    out.flush()?;
    Ok(())
}

/// Writes the whole artifact tree. Worker directories are disjoint, so they
/// fill in parallel.
pub fn write_artifacts(
    layout: &DirectoryLayout,
    config: &SetupConfig,
    split: &SplitSeries,
    long: &SideStatistics,
    short: &SideStatistics,
    clean_start: &CleanStartResult,
    spreads: &SpreadAnalysis,
) -> Result<(), PalError> {
    let ticker = &config.ticker;

    layout
        .worker_dirs
        .par_iter()
        .try_for_each(|dir| -> io::Result<()> {
            write_side_trs_files(dir, ticker, "LONG", long)?;
            write_side_trs_files(dir, ticker, "SHORT", short)?;
            let is_path = dir.join(format!("{ticker}_IS.txt"));
            match &split.indicator {
                Some(indicator) => {
                    write_series_with_indicator(&is_path, &split.in_sample, indicator)
                }
                None => write_series(&is_path, &split.in_sample),
            }
        })?;

    for dir in &layout.risk_reward_dirs {
        write_series(&dir.join(format!("{ticker}_ALL.txt")), &split.complete)?;
        write_config_manifest(dir, config, &split.in_sample, &split.out_of_sample)?;
    }

    write_series(
        &layout.validation_dir.join(format!("{ticker}_OOS.txt")),
        &split.out_of_sample,
    )?;
    if !split.reserved.is_empty() {
        write_series(
            &layout.validation_dir.join(format!("{ticker}_reserved.txt")),
            &split.reserved,
        )?;
    }

    write_details_file(
        &layout.validation_dir,
        config,
        split,
        long,
        short,
        clean_start,
        spreads,
    )?;

    Ok(())
}
