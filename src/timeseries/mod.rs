//! Timestamp-keyed OHLC and scalar containers plus the time-frame model.

mod entry;
mod numeric;
mod series;
mod timeframe;

pub use entry::{OhlcBar, VolumeUnit};
pub use numeric::{NumericEntry, NumericSeries};
pub use series::{bar_time, HashedLookup, LookupPolicy, OhlcSeries, OrderedLookup, Stamped};
pub use timeframe::{
    infer_intraday_minutes, most_common_interval, TimeFrame, TRADING_MINUTES_PER_DAY,
};
