use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::series::bar_time;
use crate::timeseries::{infer_intraday_minutes, TimeFrame};

/// One scalar observation in a [`NumericSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericEntry {
    timestamp: NaiveDateTime,
    value: Decimal,
}

impl NumericEntry {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn value(&self) -> Decimal {
        self.value
    }
}

/// Ordered sequence of one `Decimal` per timestamp; the scalar sibling of
/// `OhlcSeries` used for derived signals (closes, returns, indicators).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericSeries {
    entries: Vec<NumericEntry>,
    time_frame: TimeFrame,
}

impl NumericSeries {
    pub fn new(time_frame: TimeFrame) -> Self {
        NumericSeries {
            entries: Vec::new(),
            time_frame,
        }
    }

    pub fn new_from_range<I>(time_frame: TimeFrame, values: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = (NaiveDateTime, Decimal)>,
    {
        let mut entries: Vec<NumericEntry> = values
            .into_iter()
            .map(|(timestamp, value)| NumericEntry { timestamp, value })
            .collect();
        entries.sort_by_key(NumericEntry::timestamp);
        for pair in entries.windows(2) {
            if pair[0].timestamp == pair[1].timestamp {
                return Err(DataError::DuplicateTimestamp(pair[0].timestamp));
            }
        }
        Ok(NumericSeries {
            entries,
            time_frame,
        })
    }

    pub fn time_frame(&self) -> TimeFrame {
        self.time_frame
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, timestamp: NaiveDateTime, value: Decimal) -> Result<(), DataError> {
        match self
            .entries
            .binary_search_by_key(&timestamp, NumericEntry::timestamp)
        {
            Ok(_) => Err(DataError::DuplicateTimestamp(timestamp)),
            Err(pos) => {
                self.entries.insert(pos, NumericEntry { timestamp, value });
                Ok(())
            }
        }
    }

    pub fn delete_at(&mut self, ts: NaiveDateTime) -> Result<NumericEntry, DataError> {
        match self
            .entries
            .binary_search_by_key(&ts, NumericEntry::timestamp)
        {
            Ok(pos) => Ok(self.entries.remove(pos)),
            Err(_) => Err(DataError::NotFound(ts.to_string())),
        }
    }

    pub fn first_timestamp(&self) -> Result<NaiveDateTime, DataError> {
        self.entries
            .first()
            .map(NumericEntry::timestamp)
            .ok_or_else(|| DataError::NotFound("series is empty".into()))
    }

    pub fn last_timestamp(&self) -> Result<NaiveDateTime, DataError> {
        self.entries
            .last()
            .map(NumericEntry::timestamp)
            .ok_or_else(|| DataError::NotFound("series is empty".into()))
    }

    pub fn is_present(&self, ts: NaiveDateTime) -> bool {
        self.entries
            .binary_search_by_key(&ts, NumericEntry::timestamp)
            .is_ok()
    }

    pub fn get(&self, ts: NaiveDateTime) -> Result<&NumericEntry, DataError> {
        self.entries
            .binary_search_by_key(&ts, NumericEntry::timestamp)
            .map(|pos| &self.entries[pos])
            .map_err(|_| DataError::NotFound(ts.to_string()))
    }

    pub fn get_by_date(&self, date: NaiveDate) -> Result<&NumericEntry, DataError> {
        self.get(bar_time(date))
    }

    /// Same offset semantics as the OHLC container: positive walks earlier.
    pub fn get_value(&self, base: NaiveDateTime, offset: i64) -> Result<Decimal, DataError> {
        let pos = self
            .entries
            .binary_search_by_key(&base, NumericEntry::timestamp)
            .map_err(|_| DataError::NotFound(base.to_string()))?;
        let target = pos as i64 - offset;
        if target < 0 || target >= self.entries.len() as i64 {
            return Err(DataError::OffsetOutOfRange { base, offset });
        }
        Ok(self.entries[target as usize].value)
    }

    pub fn sorted_iter(&self) -> impl Iterator<Item = &NumericEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[NumericEntry] {
        &self.entries
    }

    /// Values in timestamp order, detached from their stamps.
    pub fn values(&self) -> Vec<Decimal> {
        self.entries.iter().map(NumericEntry::value).collect()
    }

    pub fn intraday_minutes_per_bar(&self) -> Result<u32, DataError> {
        if self.time_frame != TimeFrame::Intraday {
            return Err(DataError::WrongTimeFrame {
                expected: TimeFrame::Intraday,
                actual: self.time_frame,
            });
        }
        infer_intraday_minutes(self.entries.iter().map(NumericEntry::timestamp))
    }
}
