use crate::num::Decimal;
use crate::timeseries::{LookupPolicy, NumericSeries, OhlcBar, OhlcSeries};

/// Internal bar strength: `(close - low) / (high - low)`, defined as 0 for a
/// flat bar (`high == low`).
pub fn ibs(bar: &OhlcBar) -> Decimal {
    let range = bar.high() - bar.low();
    if range.is_zero() {
        return Decimal::ZERO;
    }
    (bar.close() - bar.low()) / range
}

/// Per-bar IBS over a whole series.
pub fn ibs1_series<P: LookupPolicy>(series: &OhlcSeries<P>) -> NumericSeries {
    let mut out = NumericSeries::new(series.time_frame());
    for bar in series.sorted_iter() {
        out.add(bar.timestamp(), ibs(&bar))
            .expect("source timestamps are unique");
    }
    out
}
