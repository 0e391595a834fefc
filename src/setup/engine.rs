//! The setup orchestrator: read, clean-start, split, estimate, emit.
//!
//! Every computation runs before the first byte of output is written, so a
//! failing run leaves no partial artifact tree behind.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::data::read_series;
use crate::error::{ConfigError, DataError, PalError};
use crate::indicators::spread::{corwin_schultz_spreads, edge_spreads, NegativePolicy, EDGE_WINDOW};
use crate::indicators::stats::{
    mean_of_slice, median_absolute_deviation, median_of_slice, roc_series, std_dev,
};
use crate::indicators::stops::{
    compute_long_stop_target, compute_robust_stop_target, compute_short_stop_target,
    partition_returns,
};
use crate::indicators::{ibs1_series, medcouple_skew, robust_qn};
use crate::num::Decimal;
use crate::setup::config::{Indicator, SetupConfig};
use crate::setup::directories::create_layout;
use crate::setup::output;
use crate::setup::quantization::{
    find_clean_start, window_parameters, CleanStartConfig, CleanStartResult,
};
use crate::timeseries::{NumericSeries, OhlcSeries, OrderedLookup, TimeFrame, VolumeUnit};

pub type Series = OhlcSeries<OrderedLookup>;

/// Chronological partition of the usable history.
#[derive(Debug)]
pub struct SplitSeries {
    pub complete: Series,
    pub in_sample: Series,
    pub out_of_sample: Series,
    pub reserved: Series,
    /// In-sample indicator values when indicator mode is on.
    pub indicator: Option<NumericSeries>,
}

/// Full-distribution statistics reported for the in-sample returns.
#[derive(Debug, Clone, Copy)]
pub struct RobustStatistics {
    pub profit_target: Decimal,
    pub stop: Decimal,
    pub median_roc: Decimal,
    pub qn: Decimal,
    pub mad: Decimal,
    pub std_dev: Decimal,
    pub skew: Decimal,
}

/// Per-side statistics from the signed return partitions.
#[derive(Debug, Clone, Copy)]
pub struct SideStatistics {
    pub profit_target: Decimal,
    pub stop: Decimal,
    pub pos_median: Decimal,
    pub pos_qn: Decimal,
    pub pos_skew: Decimal,
    pub neg_median: Decimal,
    pub neg_qn: Decimal,
    pub neg_skew: Decimal,
    pub pos_count: usize,
    pub neg_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SpreadSummary {
    pub count: usize,
    pub mean: Decimal,
    pub median: Decimal,
    pub qn: Decimal,
}

/// Out-of-sample transaction-cost estimates for the details report.
#[derive(Debug, Clone, Copy)]
pub struct SpreadAnalysis {
    pub oos_entries: usize,
    pub corwin_schultz: Option<SpreadSummary>,
    pub edge: Option<SpreadSummary>,
}

/// Everything a run computed; also the input to the artifact writer.
#[derive(Debug)]
pub struct SetupReport {
    pub config: SetupConfig,
    pub clean_start: CleanStartResult,
    pub split: SplitSeries,
    pub robust: RobustStatistics,
    pub long: SideStatistics,
    pub short: SideStatistics,
    pub spreads: SpreadAnalysis,
    /// Root of the emitted tree; `None` in stats-only mode.
    pub artifacts_dir: Option<PathBuf>,
}

impl SetupReport {
    /// Human-readable run summary, printed by the CLI in both modes.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "In-sample% = {}%", self.config.in_sample_pct);
        let _ = writeln!(s, "Out-of-sample% = {}%", self.config.out_of_sample_pct);
        let _ = writeln!(s, "Reserved% = {}%", self.config.reserved_pct);
        let _ = writeln!(s, "Median = {}", self.robust.median_roc);
        let _ = writeln!(s, "Qn  = {}", self.robust.qn);
        let _ = writeln!(s, "MAD = {}", self.robust.mad);
        let _ = writeln!(s, "Std = {}", self.robust.std_dev);
        let _ = writeln!(s, "Profit Target = {}", self.robust.profit_target);
        let _ = writeln!(s, "Stop = {}", self.robust.stop);
        let _ = writeln!(s, "Skew = {}", self.robust.skew);
        let _ = writeln!(s, "Long Profit Target = {}", self.long.profit_target);
        let _ = writeln!(s, "Long Stop = {}", self.long.stop);
        let _ = writeln!(s, "Short Profit Target = {}", self.short.profit_target);
        let _ = writeln!(s, "Short Stop = {}", self.short.stop);
        let _ = writeln!(s, "CleanStartIndex = {}", self.clean_start.start_index);
        if self.clean_start.found {
            let _ = writeln!(s, "InferredTick = {}", self.clean_start.effective_tick);
        }
        if let Some(dir) = &self.artifacts_dir {
            let _ = writeln!(s, "Artifacts = {}", dir.display());
        }
        s
    }
}

pub struct SetupEngine {
    config: SetupConfig,
    output_root: PathBuf,
}

impl SetupEngine {
    pub fn new(config: SetupConfig, output_root: impl Into<PathBuf>) -> Self {
        SetupEngine {
            config,
            output_root: output_root.into(),
        }
    }

    pub fn run(&self, data_path: &Path) -> Result<SetupReport, PalError> {
        let config = &self.config;
        config.validate_percentages()?;

        let series = read_series(
            data_path,
            config.file_format,
            config.time_frame,
            VolumeUnit::Shares,
        )?;
        if series.is_empty() {
            return Err(DataError::InsufficientSamples { needed: 1, got: 0 }.into());
        }
        info!(
            bars = series.num_entries(),
            time_frame = %config.time_frame,
            "loaded {}", data_path.display()
        );

        let clean_start = self.locate_clean_start(&series)?;
        let split = split_series(&series, &clean_start, config)?;
        info!(
            clean_start = clean_start.start_index,
            in_sample = split.in_sample.num_entries(),
            out_of_sample = split.out_of_sample.num_entries(),
            reserved = split.reserved.num_entries(),
            "partitioned series"
        );

        let robust = robust_statistics(&split.in_sample, config.holding_period)?;
        if robust.std_dev > robust.qn * Decimal::TWO {
            warn!(
                std_dev = %robust.std_dev,
                qn = %robust.qn,
                "standard deviation exceeds 2*Qn; distribution is heavy-tailed, trust Qn"
            );
        }

        let returns = roc_series(&split.in_sample.close_series(), config.holding_period as usize)
            .values();
        let (long_target, long_stop) =
            compute_long_stop_target(&split.in_sample, config.holding_period)?;
        let (short_target, short_stop) =
            compute_short_stop_target(&split.in_sample, config.holding_period)?;
        let long = side_statistics(&returns, long_target, long_stop);
        let short = side_statistics(&returns, short_target, short_stop);

        let spreads = analyze_spreads(&split.out_of_sample, config.security_tick);

        let artifacts_dir = if config.stats_only {
            None
        } else {
            let layout = create_layout(&self.output_root, config)?;
            output::write_artifacts(&layout, config, &split, &long, &short, &clean_start, &spreads)?;
            info!(dir = %layout.base_dir.display(), "artifact tree written");
            Some(layout.base_dir)
        };

        Ok(SetupReport {
            config: config.clone(),
            clean_start,
            split,
            robust,
            long,
            short,
            spreads,
            artifacts_dir,
        })
    }

    fn locate_clean_start(&self, series: &Series) -> Result<CleanStartResult, PalError> {
        let config = &self.config;
        let quant_cfg = CleanStartConfig {
            intraday_minutes_per_bar: if config.time_frame == TimeFrame::Intraday {
                config.intraday_minutes
            } else {
                0
            },
            ..CleanStartConfig::default()
        };
        let known_tick = if config.security_tick > Decimal::ZERO {
            Some(config.security_tick.to_f64())
        } else {
            None
        };
        let result = find_clean_start(series, &quant_cfg, known_tick);
        if !result.found {
            let params = window_parameters(
                config.time_frame,
                series.num_entries(),
                quant_cfg.intraday_minutes_per_bar,
            );
            if series.num_entries() >= params.window_bars {
                return Err(ConfigError::NoCleanStart(series.num_entries()).into());
            }
            // Too short to even evaluate one window; use the whole series.
            warn!(
                bars = series.num_entries(),
                window = params.window_bars,
                "series shorter than the clean-start window, starting at bar 0"
            );
        }
        Ok(result)
    }
}

/// Splits the usable tail (everything from the clean start on) into
/// in-sample, out-of-sample and reserved segments, chronologically in that
/// order. In-sample and out-of-sample sizes round down; reserved takes the
/// remainder.
pub fn split_series(
    series: &Series,
    clean_start: &CleanStartResult,
    config: &SetupConfig,
) -> Result<SplitSeries, PalError> {
    let start = if clean_start.found {
        clean_start.start_index.min(series.num_entries())
    } else {
        0
    };
    let usable = series.num_entries() - start;
    let in_sample_size = (usable as f64 * config.in_sample_pct / 100.0).floor() as usize;
    let oos_size = (usable as f64 * config.out_of_sample_pct / 100.0).floor() as usize;

    let time_frame = series.time_frame();
    let volume_unit = series.volume_unit();
    let snapshot = series.snapshot();
    let usable_bars = &snapshot[start..];
    let (in_bars, rest) = usable_bars.split_at(in_sample_size.min(usable_bars.len()));
    let (oos_bars, reserved_bars) = rest.split_at(oos_size.min(rest.len()));

    let in_sample = OhlcSeries::new_from_range(time_frame, volume_unit, in_bars.iter().copied())?;
    let out_of_sample =
        OhlcSeries::new_from_range(time_frame, volume_unit, oos_bars.iter().copied())?;
    let reserved =
        OhlcSeries::new_from_range(time_frame, volume_unit, reserved_bars.iter().copied())?;

    let indicator = match config.indicator {
        Some(Indicator::Ibs) => {
            let values = ibs1_series(&in_sample);
            info!(values = values.num_entries(), "computed in-sample IBS");
            Some(values)
        }
        None => None,
    };

    Ok(SplitSeries {
        complete: series.clone(),
        in_sample,
        out_of_sample,
        reserved,
        indicator,
    })
}

fn robust_statistics(
    in_sample: &Series,
    holding_period: u32,
) -> Result<RobustStatistics, PalError> {
    let (profit_target, stop) = compute_robust_stop_target(in_sample, holding_period)?;
    let returns = roc_series(&in_sample.close_series(), holding_period as usize).values();
    Ok(RobustStatistics {
        profit_target,
        stop,
        median_roc: median_of_slice(&returns)?,
        qn: robust_qn(&returns)?,
        mad: median_absolute_deviation(&returns)?,
        std_dev: std_dev(&returns)?,
        skew: medcouple_skew(&returns),
    })
}

fn side_statistics(returns: &[Decimal], profit_target: Decimal, stop: Decimal) -> SideStatistics {
    let (positive, negative) = partition_returns(returns);
    let zero = Decimal::ZERO;
    let safe_median = |v: &[Decimal]| median_of_slice(v).unwrap_or(zero);
    let safe_qn = |v: &[Decimal]| {
        if v.len() < 2 {
            zero
        } else {
            robust_qn(v).unwrap_or(zero)
        }
    };
    SideStatistics {
        profit_target,
        stop,
        pos_median: safe_median(&positive),
        pos_qn: safe_qn(&positive),
        pos_skew: medcouple_skew(&positive),
        neg_median: safe_median(&negative),
        neg_qn: safe_qn(&negative),
        neg_skew: medcouple_skew(&negative),
        pos_count: positive.len(),
        neg_count: negative.len(),
    }
}

fn summarize_spreads(spreads: &[Decimal]) -> Option<SpreadSummary> {
    if spreads.is_empty() {
        return None;
    }
    let qn = if spreads.len() < 2 {
        Decimal::ZERO
    } else {
        robust_qn(spreads).unwrap_or(Decimal::ZERO)
    };
    Some(SpreadSummary {
        count: spreads.len(),
        mean: mean_of_slice(spreads).unwrap_or(Decimal::ZERO),
        median: median_of_slice(spreads).unwrap_or(Decimal::ZERO),
        qn,
    })
}

fn analyze_spreads(out_of_sample: &Series, tick: Decimal) -> SpreadAnalysis {
    if out_of_sample.num_entries() < 2 {
        return SpreadAnalysis {
            oos_entries: out_of_sample.num_entries(),
            corwin_schultz: None,
            edge: None,
        };
    }
    let cs = corwin_schultz_spreads(out_of_sample, tick, NegativePolicy::Epsilon);
    let edge = edge_spreads(out_of_sample, EDGE_WINDOW, tick, NegativePolicy::Epsilon, false);
    SpreadAnalysis {
        oos_entries: out_of_sample.num_entries(),
        corwin_schultz: summarize_spreads(&cs),
        edge: summarize_spreads(&edge),
    }
}
