//! Portfolio entry filters consumed by the downstream validator.

use chrono::NaiveDateTime;

use crate::error::DataError;
use crate::indicators::volatility::{
    adaptive_volatility_percent_rank, standard_percent_rank_period, VOLATILITY_PERIOD,
};
use crate::num::Decimal;
use crate::timeseries::{bar_time, LookupPolicy, NumericSeries, OhlcSeries, TimeFrame};

/// Runtime predicate: may a new position be opened at `ts`?
pub trait EntryFilter {
    fn entries_allowed_at(&self, ts: NaiveDateTime) -> bool;
}

/// Blocks entries while annualized volatility sits in the top quartile of
/// its recent range. The rank series is precomputed from the OHLC history;
/// timestamps with no rank value deny entry.
pub struct AdaptiveVolatilityFilter {
    ranks: NumericSeries,
    threshold: Decimal,
}

impl AdaptiveVolatilityFilter {
    /// Permit entries below the 75th volatility percentile.
    pub fn default_threshold() -> Decimal {
        "0.75".parse().expect("constant parses")
    }

    pub fn new<P: LookupPolicy>(series: &OhlcSeries<P>) -> Result<Self, DataError> {
        let minutes = if series.time_frame() == TimeFrame::Intraday {
            Some(series.intraday_minutes_per_bar()?)
        } else {
            None
        };
        let rank_period = standard_percent_rank_period(series.time_frame(), minutes);
        Self::with_params(series, rank_period, Self::default_threshold())
    }

    pub fn with_params<P: LookupPolicy>(
        series: &OhlcSeries<P>,
        rank_period: usize,
        threshold: Decimal,
    ) -> Result<Self, DataError> {
        let ranks = adaptive_volatility_percent_rank(series, VOLATILITY_PERIOD, rank_period)?;
        Ok(AdaptiveVolatilityFilter { ranks, threshold })
    }
}

impl EntryFilter for AdaptiveVolatilityFilter {
    fn entries_allowed_at(&self, ts: NaiveDateTime) -> bool {
        let entry = self
            .ranks
            .get(ts)
            .or_else(|_| self.ranks.get(bar_time(ts.date())));
        match entry {
            Ok(entry) => entry.value() < self.threshold,
            Err(_) => false,
        }
    }
}

/// Null-object filter: every entry is permitted.
pub struct PassThroughFilter;

impl EntryFilter for PassThroughFilter {
    fn entries_allowed_at(&self, _ts: NaiveDateTime) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{OhlcBar, OrderedLookup, VolumeUnit};
    use chrono::NaiveDate;

    fn series_with_vol_jump() -> OhlcSeries<OrderedLookup> {
        // 80 calm bars, then 40 violent ones; with a 20-bar vol window and a
        // 30-bar rank lookback the late ranks pin near 1.
        let mut bars = Vec::new();
        let mut price = 100.0;
        for i in 0..120 {
            let step = if i < 80 { 0.05 } else { 4.0 };
            price += if i % 2 == 0 { step } else { -step };
            let c = Decimal::from_f64(price);
            bars.push(
                OhlcBar::new(
                    bar_time(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
                        + chrono::TimeDelta::days(i64::from(i)),
                    c,
                    c + Decimal::from_f64(0.01),
                    c - Decimal::from_f64(0.01),
                    c,
                    Decimal::ZERO,
                    TimeFrame::Daily,
                )
                .unwrap(),
            );
        }
        OhlcSeries::new_from_range(TimeFrame::Daily, VolumeUnit::Shares, bars).unwrap()
    }

    #[test]
    fn pass_through_always_allows() {
        let filter = PassThroughFilter;
        let ts = bar_time(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert!(filter.entries_allowed_at(ts));
    }

    #[test]
    fn missing_timestamp_denies_by_default() {
        let series = series_with_vol_jump();
        let filter = AdaptiveVolatilityFilter::with_params(
            &series,
            30,
            AdaptiveVolatilityFilter::default_threshold(),
        )
        .unwrap();
        let far_future = bar_time(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert!(!filter.entries_allowed_at(far_future));
    }

    #[test]
    fn high_volatility_regime_blocks_entries() {
        let series = series_with_vol_jump();
        let filter = AdaptiveVolatilityFilter::with_params(
            &series,
            30,
            AdaptiveVolatilityFilter::default_threshold(),
        )
        .unwrap();
        // Day 85 sits just after the regime change: its volatility window
        // holds more violent returns than any of the 30 lookback days, so
        // the rank is exactly 1 and entries are blocked.
        let ts = bar_time(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
            + chrono::TimeDelta::days(85);
        assert!(!filter.entries_allowed_at(ts));
    }

    #[test]
    fn threshold_is_configurable() {
        let series = series_with_vol_jump();
        // A threshold above any possible rank admits whatever has a value.
        let lenient =
            AdaptiveVolatilityFilter::with_params(&series, 30, "1.1".parse().unwrap()).unwrap();
        let last = series.last_timestamp().unwrap();
        assert!(lenient.entries_allowed_at(last));
    }
}
