//! Bid–ask spread estimation from bar data.
//!
//! Two estimators are provided:
//!
//! * Corwin–Schultz (2012) — isolates the spread by comparing the squared
//!   log high/low range of two single bars (`beta`) against the squared
//!   range of the combined two-bar period (`gamma`): volatility scales with
//!   the observation window, the spread does not.
//! * Edge (Ardia–Guidotti–Kroencke 2022) — a GMM estimator over all four
//!   OHLC prices; two moment-based estimates are weighted by inverse
//!   variance over a rolling window.
//!
//! Both can report a raw negative estimate in volatile stretches; callers
//! choose a [`NegativePolicy`] for those observations.

use itertools::Itertools;
use std::collections::VecDeque;

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::{LookupPolicy, OhlcBar, OhlcSeries};

/// Handling of negative (or degenerate) per-observation spread estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativePolicy {
    /// Emit 0 for the observation.
    ClampToZero,
    /// Drop the observation from the output vector.
    Skip,
    /// Emit `max(eps, tick / close)` so downstream averages never see an
    /// exact zero.
    Epsilon,
}

/// Default pair-observation window for the rolling Corwin–Schultz estimate.
pub const CORWIN_SCHULTZ_WINDOW: usize = 20;

/// Default valid-pair window for the Edge estimate.
pub const EDGE_WINDOW: usize = 30;

/// `3 - 2 * sqrt(2)`, the Corwin–Schultz alpha denominator.
const ALPHA_DEN: f64 = 3.0 - 2.0 * std::f64::consts::SQRT_2;

/// Smallest epsilon the Epsilon policy emits. One grid unit of the
/// fixed-point representation; anything finer would round to zero.
const EPS_MIN: f64 = 1e-7;

fn eps_from_tick(tick: Decimal, close: Decimal) -> f64 {
    if tick > Decimal::ZERO && close > Decimal::ZERO {
        (tick.to_f64() / close.to_f64()).max(EPS_MIN)
    } else {
        EPS_MIN
    }
}

/// Proportional spread from one two-bar period, unsmoothed.
///
/// Fails when a bar carries a non-positive high or low (the formula takes
/// logarithms). The raw estimate can be negative.
pub fn corwin_schultz_pair(prev: &OhlcBar, curr: &OhlcBar) -> Result<Decimal, DataError> {
    let h0 = prev.high().to_f64();
    let l0 = prev.low().to_f64();
    let h1 = curr.high().to_f64();
    let l1 = curr.low().to_f64();
    if l0 <= 0.0 || l1 <= 0.0 || h0 <= 0.0 || h1 <= 0.0 {
        return Err(DataError::InvalidBar {
            timestamp: curr.timestamp(),
            reason: "non-positive price in spread pair".to_string(),
        });
    }

    let beta = (h0 / l0).ln().powi(2) + (h1 / l1).ln().powi(2);
    let gamma = (h0.max(h1) / l0.min(l1)).ln().powi(2);

    let alpha = ((2.0 * beta).sqrt() - beta.sqrt()) / ALPHA_DEN - (gamma / ALPHA_DEN).sqrt();
    let exp_alpha = alpha.exp();
    let spread = 2.0 * (exp_alpha - 1.0) / (exp_alpha + 1.0);
    Ok(Decimal::from_f64(spread))
}

/// Dollar spread for one two-bar period: proportional spread times the
/// second bar's close.
pub fn corwin_schultz_dollar_pair(prev: &OhlcBar, curr: &OhlcBar) -> Result<Decimal, DataError> {
    Ok(corwin_schultz_pair(prev, curr)? * curr.close())
}

/// Rolling proportional Corwin–Schultz spreads for every `(t-1, t)` pair,
/// with `beta` and `gamma` averaged over the default 20-pair window before
/// solving for alpha.
pub fn corwin_schultz_spreads<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    tick: Decimal,
    policy: NegativePolicy,
) -> Vec<Decimal> {
    corwin_schultz_spreads_with_window(series, tick, policy, CORWIN_SCHULTZ_WINDOW)
}

pub fn corwin_schultz_spreads_with_window<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    tick: Decimal,
    policy: NegativePolicy,
    window_len: usize,
) -> Vec<Decimal> {
    let n = series.num_entries();
    let mut spreads = Vec::new();
    if n < 2 {
        return spreads;
    }
    let window_len = window_len.max(1);
    spreads.reserve(n - 1);

    let mut beta_q: VecDeque<f64> = VecDeque::new();
    let mut gamma_q: VecDeque<f64> = VecDeque::new();
    let mut beta_sum = 0.0;
    let mut gamma_sum = 0.0;

    for (e0, e1) in series.sorted_iter().tuple_windows() {
        let h0 = e0.high().to_f64();
        let l0 = e0.low().to_f64();
        let h1 = e1.high().to_f64();
        let l1 = e1.low().to_f64();

        if l0 <= 0.0 || l1 <= 0.0 || h0 <= 0.0 || h1 <= 0.0 {
            // Invalid print: emit zero so the vector length stays aligned
            // with the pair count regardless of policy.
            spreads.push(Decimal::ZERO);
            continue;
        }

        let beta_t = (h0 / l0).ln().powi(2) + (h1 / l1).ln().powi(2);
        let gamma_t = (h0.max(h1) / l0.min(l1)).ln().powi(2);

        beta_q.push_back(beta_t);
        gamma_q.push_back(gamma_t);
        beta_sum += beta_t;
        gamma_sum += gamma_t;
        if beta_q.len() > window_len {
            beta_sum -= beta_q.pop_front().expect("window non-empty");
            gamma_sum -= gamma_q.pop_front().expect("window non-empty");
        }

        // Smoothed means over whatever is available until the window fills.
        let w = beta_q.len() as f64;
        let beta_bar = beta_sum / w;
        let gamma_bar = gamma_sum / w;

        let term_beta =
            (2.0 * beta_bar).max(0.0).sqrt() - beta_bar.max(0.0).sqrt();
        let term_gamma = (gamma_bar.max(0.0) / ALPHA_DEN).sqrt();
        let alpha = term_beta / ALPHA_DEN - term_gamma;

        let exp_a = alpha.exp();
        let s = 2.0 * (exp_a - 1.0) / (exp_a + 1.0);

        if s <= 0.0 {
            match policy {
                NegativePolicy::Skip => continue,
                NegativePolicy::Epsilon => {
                    spreads.push(Decimal::from_f64(eps_from_tick(tick, e1.close())));
                }
                NegativePolicy::ClampToZero => spreads.push(Decimal::ZERO),
            }
        } else if policy == NegativePolicy::Epsilon && s < EPS_MIN {
            spreads.push(Decimal::from_f64(eps_from_tick(tick, e1.close())));
        } else {
            spreads.push(Decimal::from_f64(s));
        }
    }

    spreads
}

/// Per-pair dollar spreads, negatives floored at zero; pairs with
/// non-positive prices are dropped with a warning.
pub fn corwin_schultz_dollar_spreads<P: LookupPolicy>(series: &OhlcSeries<P>) -> Vec<Decimal> {
    let mut spreads = Vec::new();
    if series.num_entries() < 2 {
        return spreads;
    }
    spreads.reserve(series.num_entries() - 1);
    for (prev, curr) in series.sorted_iter().tuple_windows() {
        match corwin_schultz_dollar_pair(&prev, &curr) {
            Ok(spread) => spreads.push(spread.max(Decimal::ZERO)),
            Err(err) => tracing::warn!("skipping spread pair: {err}"),
        }
    }
    spreads
}

/// Mean of the rolling proportional spreads under the clamp policy.
pub fn corwin_schultz_average<P: LookupPolicy>(series: &OhlcSeries<P>) -> Decimal {
    let spreads =
        corwin_schultz_spreads(series, Decimal::ZERO, NegativePolicy::ClampToZero);
    if spreads.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = spreads.iter().copied().sum();
    sum / Decimal::from_int(spreads.len() as i64)
}

/// Rolling Edge proportional spreads.
///
/// For each `(t-1, t)` pair the 34 per-pair moment terms are pushed into a
/// `window_len` rolling window; the two GMM estimators and their variances
/// come from the window means, and the final `s² = (v₂e₁ + v₁e₂)/(v₁+v₂)` is
/// inverse-variance weighted. Emission requires at least one valid
/// (`τ = 1`) pair in the window. With `sign` set, `s` carries the sign of
/// `s²`; otherwise `s = √|s²|`.
#[allow(clippy::too_many_lines)]
pub fn edge_spreads<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    window_len: usize,
    tick: Decimal,
    policy: NegativePolicy,
    sign: bool,
) -> Vec<Decimal> {
    let n = series.num_entries();
    if n < 2 || window_len == 0 {
        return Vec::new();
    }

    let mut spreads = Vec::with_capacity(n - 1);
    let mut window: VecDeque<[f64; 34]> = VecDeque::new();

    let almost_equal = |a: f64, b: f64, tol: f64| (a - b).abs() <= tol * (a.abs() + b.abs() + 1.0);

    for (e0, e1) in series.sorted_iter().tuple_windows() {
        let (o0, h0, l0, c0) = (
            e0.open().to_f64(),
            e0.high().to_f64(),
            e0.low().to_f64(),
            e0.close().to_f64(),
        );
        let (o1, h1, l1, c1) = (
            e1.open().to_f64(),
            e1.high().to_f64(),
            e1.low().to_f64(),
            e1.close().to_f64(),
        );

        if o0 <= 0.0
            || h0 <= 0.0
            || l0 <= 0.0
            || c0 <= 0.0
            || o1 <= 0.0
            || h1 <= 0.0
            || l1 <= 0.0
            || c1 <= 0.0
        {
            // Invalid print: emit zero to keep the vector aligned.
            spreads.push(Decimal::ZERO);
            continue;
        }

        let tol = eps_from_tick(tick, e1.close());

        let (log_o1, log_h1, log_l1) = (o1.ln(), h1.ln(), l1.ln());
        let (log_h0, log_l0, log_c0) = (h0.ln(), l0.ln(), c0.ln());

        let m0 = (log_h0 + log_l0) / 2.0;
        let m1 = (log_h1 + log_l1) / 2.0;

        // Log-returns between mid, open and close anchors.
        let r1 = m1 - log_o1;
        let r2 = log_o1 - m0;
        let r3 = m1 - log_c0;
        let r4 = log_c0 - m0;
        let r5 = log_o1 - log_c0;

        // tau gates pairs where the bar carries no information (H=L=C0).
        let hl_diff = !almost_equal(log_h1, log_l1, tol);
        let lc_diff = !almost_equal(log_l1, log_c0, tol);
        let tau = if hl_diff || lc_diff { 1.0 } else { 0.0 };

        let po1 = tau * if almost_equal(log_o1, log_h1, tol) { 0.0 } else { 1.0 };
        let po2 = tau * if almost_equal(log_o1, log_l1, tol) { 0.0 } else { 1.0 };
        let pc1 = tau * if almost_equal(log_c0, log_h0, tol) { 0.0 } else { 1.0 };
        let pc2 = tau * if almost_equal(log_c0, log_l0, tol) { 0.0 } else { 1.0 };

        let mut x = [0.0f64; 34];
        x[0] = r1 * r2;
        x[1] = r3 * r4;
        x[2] = r1 * r5;
        x[3] = r4 * r5;
        x[4] = tau;
        x[5] = r1;
        x[6] = tau * r2;
        x[7] = r3;
        x[8] = tau * r4;
        x[9] = r5;
        x[10] = (r1 * r2).powi(2);
        x[11] = (r3 * r4).powi(2);
        x[12] = (r1 * r5).powi(2);
        x[13] = (r4 * r5).powi(2);
        x[14] = (r1 * r2) * (r3 * r4);
        x[15] = (r1 * r5) * (r4 * r5);
        x[16] = (tau * r2) * r2;
        x[17] = (tau * r4) * r4;
        x[18] = (tau * r5) * r5;
        x[19] = (tau * r2) * (r1 * r2);
        x[20] = (tau * r4) * (r3 * r4);
        x[21] = (tau * r5) * (r1 * r5);
        x[22] = (tau * r4) * (r4 * r5);
        x[23] = (tau * r4) * (r1 * r2);
        x[24] = (tau * r2) * (r3 * r4);
        x[25] = (tau * r2) * r4;
        x[26] = (tau * r1) * (r4 * r5);
        x[27] = (tau * r5) * (r4 * r5);
        x[28] = (tau * r4) * r5;
        x[29] = tau * r5;
        x[30] = po1;
        x[31] = po2;
        x[32] = pc1;
        x[33] = pc2;

        window.push_back(x);
        if window.len() > window_len {
            window.pop_front();
        }

        let w = window.len() as f64;
        let mut m = [0.0f64; 34];
        for row in &window {
            for (acc, v) in m.iter_mut().zip(row.iter()) {
                *acc += v;
            }
        }
        for v in &mut m {
            *v /= w;
        }

        let pt = m[4];
        let po = m[30] + m[31];
        let pc = m[32] + m[33];

        // Count of valid pairs in the window; emit with at least one.
        let nt: f64 = window.iter().map(|row| row[4]).sum();
        if nt < 1.0 {
            continue;
        }

        let pt_safe = if pt > tol { pt } else { tol };
        let po_safe = if po > tol { po } else { tol };
        let pc_safe = if pc > tol { pc } else { tol };

        let a1 = -4.0 / po_safe;
        let a2 = -4.0 / pc_safe;
        let a3 = m[5] / pt_safe;
        let a4 = m[8] / pt_safe;
        let a5 = m[7] / pt_safe;
        let a6 = m[9] / pt_safe;

        let a12 = 2.0 * a1 * a2;
        let a11 = a1 * a1;
        let a22 = a2 * a2;
        let a33 = a3 * a3;
        let a55 = a5 * a5;
        let a66 = a6 * a6;

        let e1_est = a1 * (m[0] - a3 * m[6]) + a2 * (m[1] - a4 * m[7]);
        let e2_est = a1 * (m[2] - a3 * m[29]) + a2 * (m[3] - a4 * m[9]);

        let v1 = -e1_est.powi(2)
            + (a11 * (m[10] - 2.0 * a3 * m[19] + a33 * m[16])
                + a22 * (m[11] - 2.0 * a5 * m[20] + a55 * m[17])
                + a12 * (m[14] - a3 * m[24] - a5 * m[23] + a3 * a5 * m[25]));
        let v2 = -e2_est.powi(2)
            + (a11 * (m[12] - 2.0 * a3 * m[21] + a33 * m[18])
                + a22 * (m[13] - 2.0 * a6 * m[22] + a66 * m[17])
                + a12 * (m[15] - a3 * m[27] - a6 * m[26] + a3 * a6 * m[28]));

        let vt = v1 + v2;
        let s2 = if vt > 0.0 {
            (v2 * e1_est + v1 * e2_est) / vt
        } else {
            (e1_est + e2_est) / 2.0
        };

        let mut s = s2.abs().sqrt();
        if sign && s2 < 0.0 {
            s = -s;
        }
        if !s.is_finite() {
            tracing::warn!("skipping non-finite edge spread at {}", e1.timestamp());
            continue;
        }

        if s <= tol {
            match policy {
                NegativePolicy::Skip => continue,
                NegativePolicy::Epsilon => {
                    spreads.push(Decimal::from_f64(eps_from_tick(tick, e1.close())));
                    continue;
                }
                NegativePolicy::ClampToZero => {}
            }
        }
        spreads.push(Decimal::from_f64(s));
    }

    spreads
}
