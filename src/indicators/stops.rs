//! Robust profit-target and stop-loss widths from the in-sample return
//! distribution.
//!
//! All three entry points work on the rate-of-change series of closes at a
//! given holding period. The symmetric variant uses the full distribution;
//! the long/short variants partition returns by sign and size each side from
//! its own partition. Widths are `|median| + Qn` with a medcouple adjustment
//! on the Qn term, signed so that a longer tail on the side an exit faces
//! widens that exit. Because the medcouple lies in [-1, 1] both factors stay
//! non-negative, so widths are non-negative by construction.

use crate::error::DataError;
use crate::indicators::scale::robust_qn;
use crate::indicators::skew::medcouple_skew;
use crate::indicators::stats::{median_of_slice, roc_series};
use crate::num::Decimal;
use crate::timeseries::{LookupPolicy, OhlcSeries};

/// Minimum observations per partition before a side width is estimable; the
/// medcouple of fewer points is noise.
pub const MIN_PARTITION: usize = 5;

/// Returns partitioned by sign; exact zeros belong to neither side.
pub fn partition_returns(values: &[Decimal]) -> (Vec<Decimal>, Vec<Decimal>) {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for &v in values {
        if v > Decimal::ZERO {
            positive.push(v);
        } else if v < Decimal::ZERO {
            negative.push(v);
        }
    }
    (positive, negative)
}

fn side_width(values: &[Decimal], widen_right_tail: bool) -> Result<Decimal, DataError> {
    if values.len() < MIN_PARTITION {
        return Err(DataError::InsufficientSamples {
            needed: MIN_PARTITION,
            got: values.len(),
        });
    }
    let med = median_of_slice(values)?;
    let qn = robust_qn(values)?;
    let mc = medcouple_skew(values);
    let adjustment = if widen_right_tail {
        Decimal::ONE + mc
    } else {
        Decimal::ONE - mc
    };
    Ok(med.abs() + qn * adjustment)
}

fn holding_period_returns<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    holding_period: u32,
) -> Vec<Decimal> {
    roc_series(&series.close_series(), holding_period as usize).values()
}

/// Symmetric pair `(target_width, stop_width)` from the full return
/// distribution: `|median| + Qn·(1 + mc)` for the target and
/// `|median| + Qn·(1 - mc)` for the stop.
pub fn compute_robust_stop_target<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    holding_period: u32,
) -> Result<(Decimal, Decimal), DataError> {
    let returns = holding_period_returns(series, holding_period);
    if returns.len() < MIN_PARTITION {
        return Err(DataError::InsufficientSamples {
            needed: MIN_PARTITION,
            got: returns.len(),
        });
    }
    let med = median_of_slice(&returns)?;
    let qn = robust_qn(&returns)?;
    let mc = medcouple_skew(&returns);
    let target = med.abs() + qn * (Decimal::ONE + mc);
    let stop = med.abs() + qn * (Decimal::ONE - mc);
    Ok((target, stop))
}

/// Long-side pair: the target faces the positive partition (right tail), the
/// stop faces the negative partition (left tail).
pub fn compute_long_stop_target<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    holding_period: u32,
) -> Result<(Decimal, Decimal), DataError> {
    let returns = holding_period_returns(series, holding_period);
    let (positive, negative) = partition_returns(&returns);
    let target = side_width(&positive, true)?;
    let stop = side_width(&negative, false)?;
    Ok((target, stop))
}

/// Short-side pair, the mirror of the long case: the target faces the
/// negative partition, the stop the positive one.
pub fn compute_short_stop_target<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    holding_period: u32,
) -> Result<(Decimal, Decimal), DataError> {
    let returns = holding_period_returns(series, holding_period);
    let (positive, negative) = partition_returns(&returns);
    let target = side_width(&negative, false)?;
    let stop = side_width(&positive, true)?;
    Ok((target, stop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{bar_time, OhlcBar, OrderedLookup, TimeFrame, VolumeUnit};
    use chrono::NaiveDate;

    fn series_from_closes(closes: &[f64]) -> OhlcSeries<OrderedLookup> {
        let bars = closes.iter().enumerate().map(|(i, &c)| {
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
                + chrono::TimeDelta::days(i as i64);
            let c = Decimal::from_f64(c);
            OhlcBar::new(bar_time(date), c, c, c, c, Decimal::ZERO, TimeFrame::Daily).unwrap()
        });
        OhlcSeries::new_from_range(TimeFrame::Daily, VolumeUnit::Shares, bars).unwrap()
    }

    /// Alternating up/down closes give both partitions plenty of mass.
    fn oscillating_series() -> OhlcSeries<OrderedLookup> {
        let mut closes = Vec::new();
        let mut price = 100.0;
        for i in 0..120 {
            let pct = 0.5 + f64::from(i % 7) * 0.3;
            price *= if i % 2 == 0 { 1.0 + pct / 100.0 } else { 1.0 - pct / 100.0 };
            closes.push(price);
        }
        series_from_closes(&closes)
    }

    #[test]
    fn widths_are_positive_on_two_sided_distributions() {
        let series = oscillating_series();
        let (target, stop) = compute_robust_stop_target(&series, 1).unwrap();
        assert!(target > Decimal::ZERO);
        assert!(stop > Decimal::ZERO);

        let (lt, ls) = compute_long_stop_target(&series, 1).unwrap();
        let (st, ss) = compute_short_stop_target(&series, 1).unwrap();
        assert!(lt > Decimal::ZERO && ls > Decimal::ZERO);
        assert!(st > Decimal::ZERO && ss > Decimal::ZERO);
    }

    #[test]
    fn long_and_short_are_mirrors() {
        let series = oscillating_series();
        let (long_target, long_stop) = compute_long_stop_target(&series, 1).unwrap();
        let (short_target, short_stop) = compute_short_stop_target(&series, 1).unwrap();
        assert_eq!(long_target, short_stop);
        assert_eq!(long_stop, short_target);
    }

    #[test]
    fn one_sided_distribution_fails_partition_minimum() {
        // Strictly rising closes: the negative partition is empty.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + f64::from(i)).collect();
        let series = series_from_closes(&closes);
        assert!(matches!(
            compute_long_stop_target(&series, 1),
            Err(DataError::InsufficientSamples { .. })
        ));
        assert!(matches!(
            compute_short_stop_target(&series, 1),
            Err(DataError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn short_series_fails_early() {
        let series = series_from_closes(&[100.0, 101.0, 102.0]);
        assert!(matches!(
            compute_robust_stop_target(&series, 1),
            Err(DataError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn holding_period_changes_the_width() {
        let series = oscillating_series();
        let (t1, _) = compute_robust_stop_target(&series, 1).unwrap();
        let (t5, _) = compute_robust_stop_target(&series, 5).unwrap();
        assert_ne!(t1, t5);
    }

    #[test]
    fn partition_drops_exact_zeros() {
        let values = [
            Decimal::from_int(1),
            Decimal::ZERO,
            Decimal::from_int(-2),
            Decimal::ZERO,
        ];
        let (pos, neg) = partition_returns(&values);
        assert_eq!(pos.len(), 1);
        assert_eq!(neg.len(), 1);
    }
}
