use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::TimeFrame;

/// Unit the volume column is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeUnit {
    Shares,
    Contracts,
}

/// One immutable OHLC bar. The constructor enforces the price-relationship
/// invariants; a bar that survives construction is well-formed forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcBar {
    timestamp: NaiveDateTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    time_frame: TimeFrame,
}

impl OhlcBar {
    /// Validates `high >= low`, `low <= min(open, close)`,
    /// `high >= max(open, close)` and a non-negative volume.
    ///
    /// Prices are not required to be strictly positive here; the estimators
    /// that take logarithms skip non-positive prints themselves.
    pub fn new(
        timestamp: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        time_frame: TimeFrame,
    ) -> Result<Self, DataError> {
        let invalid = |reason: &str| DataError::InvalidBar {
            timestamp,
            reason: reason.to_string(),
        };
        if high < low {
            return Err(invalid("high is below low"));
        }
        if low > open.min(close) {
            return Err(invalid("low is above open or close"));
        }
        if high < open.max(close) {
            return Err(invalid("high is below open or close"));
        }
        if volume < Decimal::ZERO {
            return Err(invalid("negative volume"));
        }
        Ok(OhlcBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            time_frame,
        })
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn time_frame(&self) -> TimeFrame {
        self.time_frame
    }
}
