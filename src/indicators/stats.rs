//! Returns and central-tendency statistics over numeric series.

use statrs::statistics::Statistics;

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::NumericSeries;

/// Rate-of-change series: `(v_t / v_{t-period} - 1) * 100`, starting at index
/// `period`. Observations with a zero base are skipped.
pub fn roc_series(series: &NumericSeries, period: usize) -> NumericSeries {
    let entries = series.entries();
    let mut out = NumericSeries::new(series.time_frame());
    if period == 0 || entries.len() <= period {
        return out;
    }
    for i in period..entries.len() {
        let base = entries[i - period].value();
        if base.is_zero() {
            continue;
        }
        let roc = (entries[i].value() / base - Decimal::ONE) * Decimal::ONE_HUNDRED;
        out.add(entries[i].timestamp(), roc)
            .expect("input timestamps are unique");
    }
    out
}

pub fn mean_of_slice(values: &[Decimal]) -> Result<Decimal, DataError> {
    if values.is_empty() {
        return Err(DataError::InsufficientSamples { needed: 1, got: 0 });
    }
    let sum: Decimal = values.iter().copied().sum();
    Ok(sum / Decimal::from_int(values.len() as i64))
}

/// Median; the two central values average for even sizes.
pub fn median_of_slice(values: &[Decimal]) -> Result<Decimal, DataError> {
    if values.is_empty() {
        return Err(DataError::InsufficientSamples { needed: 1, got: 0 });
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
    }
}

pub fn median(series: &NumericSeries) -> Result<Decimal, DataError> {
    median_of_slice(&series.values())
}

/// Median absolute deviation without a consistency constant.
pub fn median_absolute_deviation(values: &[Decimal]) -> Result<Decimal, DataError> {
    let center = median_of_slice(values)?;
    let deviations: Vec<Decimal> = values.iter().map(|v| (*v - center).abs()).collect();
    median_of_slice(&deviations)
}

/// Sample standard deviation, computed on the `f64` view and rounded back.
pub fn std_dev(values: &[Decimal]) -> Result<Decimal, DataError> {
    if values.len() < 2 {
        return Err(DataError::InsufficientSamples {
            needed: 2,
            got: values.len(),
        });
    }
    let view: Vec<f64> = values.iter().map(|v| v.to_f64()).collect();
    Ok(Decimal::from_f64(view.std_dev()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::{bar_time, TimeFrame};
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn closes(values: &[&str]) -> NumericSeries {
        NumericSeries::new_from_range(
            TimeFrame::Daily,
            values.iter().enumerate().map(|(i, v)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::TimeDelta::days(i as i64);
                (bar_time(date), dec(v))
            }),
        )
        .unwrap()
    }

    #[test]
    fn roc_starts_at_period_and_scales_by_hundred() {
        let s = closes(&["100", "110", "121"]);
        let roc = roc_series(&s, 1);
        assert_eq!(roc.num_entries(), 2);
        assert_eq!(roc.values(), vec![dec("10"), dec("10")]);

        let roc2 = roc_series(&s, 2);
        assert_eq!(roc2.values(), vec![dec("21")]);
    }

    #[test]
    fn roc_on_short_series_is_empty() {
        let s = closes(&["100"]);
        assert!(roc_series(&s, 1).is_empty());
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(
            median_of_slice(&[dec("3"), dec("1"), dec("2")]).unwrap(),
            dec("2")
        );
        assert_eq!(
            median_of_slice(&[dec("4"), dec("1"), dec("2"), dec("3")]).unwrap(),
            dec("2.5")
        );
        assert!(median_of_slice(&[]).is_err());
    }

    #[test]
    fn mad_is_median_of_absolute_deviations() {
        // median 3, deviations {2,1,0,1,2} -> MAD 1
        let v = [dec("1"), dec("2"), dec("3"), dec("4"), dec("5")];
        assert_eq!(median_absolute_deviation(&v).unwrap(), dec("1"));
    }

    #[test]
    fn std_dev_matches_hand_computation() {
        // sample std of {2,4,4,4,5,5,7,9} = sqrt(32/7)
        let v: Vec<Decimal> = ["2", "4", "4", "4", "5", "5", "7", "9"]
            .iter()
            .map(|s| dec(s))
            .collect();
        let expected = Decimal::from_f64((32.0_f64 / 7.0).sqrt());
        assert_eq!(std_dev(&v).unwrap(), expected);
        assert!(std_dev(&v[..1]).is_err());
    }
}
