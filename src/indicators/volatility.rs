//! Annualized close-to-close volatility and its percent rank, the signal
//! behind the adaptive volatility portfolio filter.

use statrs::statistics::Statistics;

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::{LookupPolicy, NumericSeries, OhlcSeries, TimeFrame};

/// Rolling window for the volatility estimate itself.
pub const VOLATILITY_PERIOD: usize = 20;

/// Default percent-rank lookback per time frame (one year of bars; intraday
/// uses twenty sessions).
pub fn standard_percent_rank_period(
    time_frame: TimeFrame,
    intraday_minutes: Option<u32>,
) -> usize {
    match time_frame {
        TimeFrame::Daily => 252,
        TimeFrame::Weekly => 52,
        TimeFrame::Monthly => 12,
        TimeFrame::Quarterly => 4,
        TimeFrame::Intraday => {
            let minutes = intraday_minutes.unwrap_or(1).max(1);
            let bars_per_day =
                (f64::from(crate::timeseries::TRADING_MINUTES_PER_DAY) / f64::from(minutes))
                    .round()
                    .max(1.0) as usize;
            bars_per_day * 20
        }
    }
}

/// Annualized close-to-close volatility series: rolling sample standard
/// deviation of log returns over [`VOLATILITY_PERIOD`] bars, scaled by the
/// annualization factor. Bars with non-positive closes are skipped.
pub fn annualized_volatility_series<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    vol_period: usize,
    annualization: f64,
) -> NumericSeries {
    let mut out = NumericSeries::new(series.time_frame());
    let snapshot = series.snapshot();
    let bars: &[crate::timeseries::OhlcBar] = &snapshot;
    if vol_period < 2 || bars.len() <= vol_period {
        return out;
    }

    let mut log_returns: Vec<(chrono::NaiveDateTime, f64)> = Vec::with_capacity(bars.len());
    for pair in bars.windows(2) {
        let prev = pair[0].close().to_f64();
        let curr = pair[1].close().to_f64();
        if prev > 0.0 && curr > 0.0 {
            log_returns.push((pair[1].timestamp(), (curr / prev).ln()));
        }
    }

    for i in vol_period..=log_returns.len() {
        let window: Vec<f64> = log_returns[i - vol_period..i].iter().map(|(_, r)| *r).collect();
        let vol = window.std_dev() * annualization;
        let (ts, _) = log_returns[i - 1];
        out.add(ts, Decimal::from_f64(vol))
            .expect("return timestamps are unique");
    }
    out
}

/// Percent rank of each value against the preceding `rank_period`
/// observations: the fraction of the lookback strictly below the current
/// value. Output starts once a full lookback is available.
pub fn percent_rank_series(series: &NumericSeries, rank_period: usize) -> NumericSeries {
    let mut out = NumericSeries::new(series.time_frame());
    let entries = series.entries();
    if rank_period == 0 || entries.len() <= rank_period {
        return out;
    }
    for i in rank_period..entries.len() {
        let current = entries[i].value();
        let below = entries[i - rank_period..i]
            .iter()
            .filter(|e| e.value() < current)
            .count();
        let rank = Decimal::from_int(below as i64) / Decimal::from_int(rank_period as i64);
        out.add(entries[i].timestamp(), rank)
            .expect("input timestamps are unique");
    }
    out
}

/// Annualized volatility percent rank — the composed series consumed by the
/// adaptive volatility filter. The annualization factor comes from the
/// series' time frame (intraday series contribute their bar spacing).
pub fn adaptive_volatility_percent_rank<P: LookupPolicy>(
    series: &OhlcSeries<P>,
    vol_period: usize,
    rank_period: usize,
) -> Result<NumericSeries, DataError> {
    let minutes = if series.time_frame() == TimeFrame::Intraday {
        Some(series.intraday_minutes_per_bar()?)
    } else {
        None
    };
    let annualization = series.time_frame().annualization_factor(minutes);
    let vol = annualized_volatility_series(series, vol_period, annualization);
    Ok(percent_rank_series(&vol, rank_period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{bar_time, OhlcBar, OrderedLookup, VolumeUnit};
    use chrono::NaiveDate;

    fn daily_series(closes: &[f64]) -> OhlcSeries<OrderedLookup> {
        let bars = closes.iter().enumerate().map(|(i, &c)| {
            let date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
                + chrono::TimeDelta::days(i as i64);
            let c = Decimal::from_f64(c);
            OhlcBar::new(
                bar_time(date),
                c,
                c,
                c,
                c,
                Decimal::ZERO,
                TimeFrame::Daily,
            )
            .unwrap()
        });
        OhlcSeries::new_from_range(TimeFrame::Daily, VolumeUnit::Shares, bars).unwrap()
    }

    #[test]
    fn rank_period_defaults_per_frame() {
        assert_eq!(standard_percent_rank_period(TimeFrame::Daily, None), 252);
        assert_eq!(standard_percent_rank_period(TimeFrame::Weekly, None), 52);
        assert_eq!(
            standard_percent_rank_period(TimeFrame::Intraday, Some(39)),
            200
        );
    }

    #[test]
    fn volatility_rises_with_larger_moves() {
        // 30 calm bars then 30 wild ones.
        let mut closes = Vec::new();
        let mut price = 100.0;
        for i in 0..60 {
            let step = if i < 30 { 0.1 } else { 3.0 };
            price += if i % 2 == 0 { step } else { -step };
            closes.push(price);
        }
        let series = daily_series(&closes);
        let vol = annualized_volatility_series(&series, 5, 1.0);
        let values = vol.values();
        assert!(values.last().unwrap() > values.first().unwrap());
    }

    #[test]
    fn percent_rank_is_in_unit_interval_and_flags_extremes() {
        let series = NumericSeries::new_from_range(
            TimeFrame::Daily,
            (0..20).map(|i| {
                let date = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap()
                    + chrono::TimeDelta::days(i64::from(i));
                (bar_time(date), Decimal::from_int(i64::from(i)))
            }),
        )
        .unwrap();
        let ranks = percent_rank_series(&series, 10);
        assert_eq!(ranks.num_entries(), 10);
        // A strictly increasing input pins every rank at 1.
        assert!(ranks.values().iter().all(|r| *r == Decimal::ONE));
    }

    #[test]
    fn short_input_yields_empty_output() {
        let series = daily_series(&[100.0, 101.0, 102.0]);
        assert!(annualized_volatility_series(&series, 20, 1.0).is_empty());
    }
}
