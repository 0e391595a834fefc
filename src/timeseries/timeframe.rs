use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ConfigError, DataError};

/// Bar granularity of a series. Intraday spacing is a property of the
/// containing series (mode of inter-bar gaps), not of the frame itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Intraday,
}

/// Minutes in a regular U.S. equity session, used to turn an intraday bar
/// interval into bars-per-day.
pub const TRADING_MINUTES_PER_DAY: u32 = 390;

impl TimeFrame {
    /// Case-insensitive parse; accepts the full name or its first letter
    /// (`D`, `W`, `M`, `Q`, `I`).
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DAILY" | "D" => Ok(TimeFrame::Daily),
            "WEEKLY" | "W" => Ok(TimeFrame::Weekly),
            "MONTHLY" | "M" => Ok(TimeFrame::Monthly),
            "QUARTERLY" | "Q" => Ok(TimeFrame::Quarterly),
            "INTRADAY" | "I" => Ok(TimeFrame::Intraday),
            _ => Err(ConfigError::UnknownTimeFrame(name.to_string())),
        }
    }

    pub fn is_intraday(self) -> bool {
        self == TimeFrame::Intraday
    }

    /// Bars per year for annualization. Intraday needs the series' bar
    /// spacing in minutes.
    pub fn bars_per_year(self, intraday_minutes: Option<u32>) -> f64 {
        match self {
            TimeFrame::Daily => 252.0,
            TimeFrame::Weekly => 52.0,
            TimeFrame::Monthly => 12.0,
            TimeFrame::Quarterly => 4.0,
            TimeFrame::Intraday => {
                let minutes = intraday_minutes.unwrap_or(1).max(1);
                252.0 * f64::from(TRADING_MINUTES_PER_DAY) / f64::from(minutes)
            }
        }
    }

    /// `sqrt(bars_per_year)`, the volatility annualization factor.
    pub fn annualization_factor(self, intraday_minutes: Option<u32>) -> f64 {
        self.bars_per_year(intraday_minutes).sqrt()
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeFrame::Daily => "Daily",
            TimeFrame::Weekly => "Weekly",
            TimeFrame::Monthly => "Monthly",
            TimeFrame::Quarterly => "Quarterly",
            TimeFrame::Intraday => "Intraday",
        };
        f.write_str(s)
    }
}

/// Most common positive gap between consecutive timestamps. Holiday closes
/// and session boundaries produce occasional oversized gaps; the mode ignores
/// them, and ties resolve to the smaller gap so spacing is never
/// overestimated.
pub fn most_common_interval<I>(timestamps: I) -> Result<TimeDelta, DataError>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut counts: BTreeMap<TimeDelta, u32> = BTreeMap::new();
    let mut samples = 0usize;
    for (prev, curr) in timestamps.into_iter().tuple_windows() {
        samples += 1;
        let gap = curr - prev;
        if gap > TimeDelta::zero() {
            *counts.entry(gap).or_insert(0) += 1;
        }
    }
    if samples == 0 {
        return Err(DataError::InsufficientSamples { needed: 2, got: samples + 1 });
    }

    // BTreeMap iterates smallest gap first; strict `>` keeps the smaller gap
    // on a tie.
    counts
        .iter()
        .fold(None, |best: Option<(TimeDelta, u32)>, (&gap, &n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((gap, n)),
        })
        .map(|(gap, _)| gap)
        .ok_or(DataError::NoPositiveGap)
}

/// [`most_common_interval`] expressed in whole minutes.
pub fn infer_intraday_minutes<I>(timestamps: I) -> Result<u32, DataError>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let gap = most_common_interval(timestamps)?;
    Ok((gap.num_seconds() / 60) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parse_is_case_insensitive_with_aliases() {
        assert_eq!(TimeFrame::parse("daily").unwrap(), TimeFrame::Daily);
        assert_eq!(TimeFrame::parse("WEEKLY").unwrap(), TimeFrame::Weekly);
        assert_eq!(TimeFrame::parse("m").unwrap(), TimeFrame::Monthly);
        assert_eq!(TimeFrame::parse("Quarterly").unwrap(), TimeFrame::Quarterly);
        assert_eq!(TimeFrame::parse("I").unwrap(), TimeFrame::Intraday);
        assert!(matches!(
            TimeFrame::parse("hourly"),
            Err(ConfigError::UnknownTimeFrame(_))
        ));
    }

    #[test]
    fn interval_mode_ignores_holiday_gap() {
        // 09:00..12:00 hourly, a 2h lunch-halt gap, then hourly again.
        let stamps = vec![at(9, 0), at(10, 0), at(11, 0), at(12, 0), at(14, 0), at(15, 0)];
        assert_eq!(infer_intraday_minutes(stamps).unwrap(), 60);
    }

    #[test]
    fn interval_mode_prefers_smaller_gap_on_tie() {
        let stamps = vec![at(9, 0), at(9, 30), at(10, 30), at(11, 0), at(12, 0)];
        // gaps: 30, 60, 30, 60 — tie, smaller wins
        assert_eq!(infer_intraday_minutes(stamps).unwrap(), 30);
    }

    #[test]
    fn interval_mode_error_cases() {
        assert!(matches!(
            infer_intraday_minutes(vec![at(9, 0)]),
            Err(DataError::InsufficientSamples { .. })
        ));
        assert!(matches!(
            infer_intraday_minutes(vec![at(9, 0), at(9, 0), at(9, 0)]),
            Err(DataError::NoPositiveGap)
        ));
    }

    #[test]
    fn annualization_scales_with_intraday_minutes() {
        assert_eq!(TimeFrame::Daily.bars_per_year(None), 252.0);
        assert_eq!(TimeFrame::Intraday.bars_per_year(Some(390)), 252.0);
        assert_eq!(TimeFrame::Intraday.bars_per_year(Some(39)), 2520.0);
    }
}
