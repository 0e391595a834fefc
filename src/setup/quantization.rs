//! Quantization-aware clean-start detection.
//!
//! Split-adjusted equity history quantizes early prices onto a coarse grid;
//! when the grid step dominates the price, long runs of zero returns bias any
//! robust scale estimator downward. The analyzer infers the effective tick
//! actually present in the data and slides a window forward until price
//! resolution, zero-return share and level diversity all look healthy.

use rustc_hash::FxHashSet;

use crate::timeseries::{LookupPolicy, OhlcSeries, TimeFrame};

/// Decimal places to probe when inferring the tick grid.
const MAX_TICK_DECIMALS: u32 = 8;

/// Share of prices that must sit on the integer grid at a candidate scale.
const INTEGRAL_THRESHOLD: f64 = 0.95;

/// Fallback tick (one cent) when the data cannot support inference.
const FALLBACK_TICK: f64 = 1e-2;

/// Thresholds for the clean-start window search.
#[derive(Debug, Clone)]
pub struct CleanStartConfig {
    pub max_rel_tick: f64,
    pub max_zero_frac: f64,
    pub min_unique_levels: usize,
    /// Bar spacing of an intraday series, 0 when unknown.
    pub intraday_minutes_per_bar: u32,
}

impl Default for CleanStartConfig {
    fn default() -> Self {
        CleanStartConfig {
            max_rel_tick: 0.005,
            max_zero_frac: 0.30,
            min_unique_levels: 120,
            intraday_minutes_per_bar: 0,
        }
    }
}

/// Frame-dependent window and stability buffer for the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParameters {
    pub window_bars: usize,
    pub stability_buffer_bars: usize,
}

/// Outcome of the clean-start search.
#[derive(Debug, Clone, Copy)]
pub struct CleanStartResult {
    pub start_index: usize,
    pub effective_tick: f64,
    pub rel_tick: f64,
    pub zero_fraction: f64,
    pub found: bool,
}

impl CleanStartResult {
    fn not_found() -> Self {
        CleanStartResult {
            start_index: 0,
            effective_tick: FALLBACK_TICK,
            rel_tick: 0.0,
            zero_fraction: 0.0,
            found: false,
        }
    }
}

fn looks_integral(y: f64) -> bool {
    let tol = (y.abs() * 1e-12).max(1e-8);
    (y - y.round()).abs() < tol
}

/// Effective tick of a price window: the smallest power-of-ten scale at which
/// most prices look integral, refined by the GCD of adjacent unique level
/// differences. Falls back to `10^-k` when the levels degenerate.
pub fn estimate_tick_from_range(prices: &[f64]) -> f64 {
    let finite: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
    if finite.len() < 2 {
        return FALLBACK_TICK;
    }

    // 1) Smallest scale where enough points sit on the integer grid.
    let mut best_k = 2u32; // pennies as the pragmatic fallback
    for k in 0..=MAX_TICK_DECIMALS {
        let scale = 10f64.powi(k as i32);
        let ok = finite.iter().filter(|&&x| looks_integral(x * scale)).count();
        if ok as f64 >= INTEGRAL_THRESHOLD * finite.len() as f64 {
            best_k = k;
            break;
        }
    }
    let scale = 10f64.powi(best_k as i32);
    let fallback = 10f64.powi(-(best_k as i32));

    // 2) Quantize to integer levels, unique and sorted.
    let mut levels: Vec<i64> = finite.iter().map(|&x| (x * scale).round() as i64).collect();
    levels.sort_unstable();
    levels.dedup();
    if levels.len() < 2 {
        return fallback;
    }

    // 3) GCD of positive adjacent differences, back in price units.
    let mut g: i64 = 0;
    for pair in levels.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > 0 {
            g = if g == 0 { diff } else { gcd(g, diff) };
        }
    }
    if g <= 0 {
        g = 1;
    }
    g as f64 / scale
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Effective tick of a whole series, from its closes.
pub fn estimate_effective_tick<P: LookupPolicy>(series: &OhlcSeries<P>) -> f64 {
    let closes: Vec<f64> = series
        .sorted_iter()
        .map(|bar| bar.close().to_f64())
        .collect();
    estimate_tick_from_range(&closes)
}

/// Tick divided by the window's median price; infinite when undefined. A
/// high value means quantization dominates returns.
fn relative_tick(window_prices: &[f64], tick: f64) -> f64 {
    if window_prices.is_empty() || tick <= 0.0 {
        return f64::INFINITY;
    }
    let mut sorted: Vec<f64> = window_prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite prices"));
    let m = sorted.len() / 2;
    let med = if sorted.len() % 2 == 0 {
        0.5 * (sorted[m - 1] + sorted[m])
    } else {
        sorted[m]
    };
    if med > 0.0 && med.is_finite() {
        tick / med
    } else {
        f64::INFINITY
    }
}

/// Share of consecutive moves no larger than one tick.
fn zero_return_fraction(window_prices: &[f64], tick: f64) -> f64 {
    if window_prices.len() < 2 {
        return 1.0;
    }
    let mut zero_moves = 0usize;
    let mut total_moves = 0usize;
    for pair in window_prices.windows(2) {
        if pair[0].is_finite() && pair[1].is_finite() {
            if (pair[1] - pair[0]).abs() <= tick {
                zero_moves += 1;
            }
            total_moves += 1;
        }
    }
    if total_moves > 0 {
        zero_moves as f64 / total_moves as f64
    } else {
        1.0
    }
}

/// Distinct price levels on the tick grid within the window.
fn unique_price_levels(window_prices: &[f64], tick: f64) -> usize {
    if tick <= 0.0 {
        return 0;
    }
    let inv = 1.0 / tick;
    let levels: FxHashSet<i64> = window_prices
        .iter()
        .filter(|p| p.is_finite())
        .map(|&p| (p * inv).round() as i64)
        .collect();
    levels.len()
}

fn intraday_bars_per_day(minutes_per_bar: u32) -> usize {
    if minutes_per_bar == 0 {
        return 390; // assume 1-minute bars when unknown
    }
    ((390.0 / f64::from(minutes_per_bar)).round() as usize).max(1)
}

/// Window and buffer sizes per time frame. Intraday windows shrink for short
/// series so at least a couple of positions can be evaluated.
pub fn window_parameters(
    time_frame: TimeFrame,
    series_total_bars: usize,
    intraday_minutes: u32,
) -> WindowParameters {
    match time_frame {
        TimeFrame::Daily => WindowParameters {
            window_bars: 252,
            stability_buffer_bars: 20,
        },
        TimeFrame::Weekly => WindowParameters {
            window_bars: 260,
            stability_buffer_bars: 4,
        },
        TimeFrame::Monthly | TimeFrame::Quarterly => WindowParameters {
            window_bars: 60,
            stability_buffer_bars: 3,
        },
        TimeFrame::Intraday => {
            let bars_per_day = intraday_bars_per_day(intraday_minutes);
            let mut desired_days = 20usize;
            while bars_per_day * desired_days >= series_total_bars && desired_days > 2 {
                desired_days /= 2;
            }
            WindowParameters {
                window_bars: (bars_per_day * desired_days).max(3),
                stability_buffer_bars: (bars_per_day * 10).max(60),
            }
        }
    }
}

/// Slides a window across the closes and accepts the first one whose
/// relative tick, zero-return share and level diversity all pass; the chosen
/// start then advances by the stability buffer. `known_tick` (from security
/// metadata or the CLI) refines each window's inferred tick downward.
pub fn find_clean_start<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    cfg: &CleanStartConfig,
    known_tick: Option<f64>,
) -> CleanStartResult {
    let closes: Vec<f64> = series
        .sorted_iter()
        .map(|bar| bar.close().to_f64())
        .collect();
    let n = closes.len();

    let params = window_parameters(
        series.time_frame(),
        n,
        cfg.intraday_minutes_per_bar,
    );
    let window = params.window_bars;
    if n < window {
        return CleanStartResult::not_found();
    }

    for left in 0..=(n - window) {
        let window_prices = &closes[left..left + window];

        let mut tick = estimate_tick_from_range(window_prices);
        if let Some(known) = known_tick {
            if known > 0.0 {
                tick = tick.min(known);
            }
        }

        let rel_tick = relative_tick(window_prices, tick);
        let zero_frac = zero_return_fraction(window_prices, tick);
        let levels = unique_price_levels(window_prices, tick);

        let clean = rel_tick <= cfg.max_rel_tick
            && zero_frac <= cfg.max_zero_frac
            && levels >= cfg.min_unique_levels;

        if clean {
            let buffered = left + params.stability_buffer_bars;
            return CleanStartResult {
                start_index: buffered.min(n - 1),
                effective_tick: tick,
                rel_tick,
                zero_fraction: zero_frac,
                found: true,
            };
        }
    }

    CleanStartResult::not_found()
}
