//! Tabular readers for the historical data formats.
//!
//! Each vendor layout is a column schema over a plain CSV file; the reader
//! normalizes every row into an [`OhlcBar`] and bulk-loads the series, so
//! duplicate timestamps and malformed bars surface as the container's own
//! errors.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DataError, PalError};
use crate::num::Decimal;
use crate::timeseries::{bar_time, OhlcBar, OhlcSeries, OrderedLookup, TimeFrame, VolumeUnit};

/// The vendor layouts understood by [`read_series`], tagged 1-6 on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    /// `YYYYMMDD,O,H,L,C,V,OI` — CSI futures export, no header.
    CsiFutures,
    /// CSI extended: same leading columns, extra trailing fields ignored.
    CsiExtended,
    /// TradeStation export with a header row. EOD: `MM/DD/YYYY,O,H,L,C,V,OI`;
    /// intraday: `MM/DD/YYYY,HH:MM,O,H,L,C,Up,Down`.
    TradeStation,
    /// `MM/DD/YYYY,O,H,L,C,V` — Pinnacle, no header.
    Pinnacle,
    /// `YYYYMMDD,O,H,L,C[,V]` (EOD) or `YYYYMMDD,HHMM,O,H,L,C[,V]`
    /// (intraday) — the PAL layouts, no header.
    Pal,
    /// `YYYYMMDD[ HHMM],O,H,L,C,V` — WealthLab, no header.
    WealthLab,
}

impl FileFormat {
    pub fn from_tag(tag: u32) -> Result<Self, ConfigError> {
        match tag {
            1 => Ok(FileFormat::CsiFutures),
            2 => Ok(FileFormat::CsiExtended),
            3 => Ok(FileFormat::TradeStation),
            4 => Ok(FileFormat::Pinnacle),
            5 => Ok(FileFormat::Pal),
            6 => Ok(FileFormat::WealthLab),
            other => Err(ConfigError::UnknownFileFormat(other.to_string())),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            FileFormat::CsiFutures => 1,
            FileFormat::CsiExtended => 2,
            FileFormat::TradeStation => 3,
            FileFormat::Pinnacle => 4,
            FileFormat::Pal => 5,
            FileFormat::WealthLab => 6,
        }
    }

    fn has_header(self) -> bool {
        matches!(self, FileFormat::TradeStation)
    }
}

fn malformed(line: u64, what: &str, value: &str) -> PalError {
    PalError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("line {line}: cannot parse {what} from '{value}'"),
    ))
}

fn parse_decimal(field: &str, line: u64, what: &str) -> Result<Decimal, PalError> {
    field
        .trim()
        .parse()
        .map_err(|_| malformed(line, what, field))
}

fn parse_date(field: &str, format: &str, line: u64) -> Result<NaiveDate, PalError> {
    NaiveDate::parse_from_str(field.trim(), format).map_err(|_| malformed(line, "date", field))
}

fn parse_time(field: &str, format: &str, line: u64) -> Result<NaiveTime, PalError> {
    NaiveTime::parse_from_str(field.trim(), format).map_err(|_| malformed(line, "time", field))
}

struct RawBar {
    timestamp: NaiveDateTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, line: u64) -> Result<&'a str, PalError> {
    record
        .get(idx)
        .ok_or_else(|| malformed(line, "column", &format!("index {idx}")))
}

fn parse_record(
    record: &csv::StringRecord,
    line: u64,
    format: FileFormat,
    time_frame: TimeFrame,
) -> Result<RawBar, PalError> {
    let intraday = time_frame == TimeFrame::Intraday;

    // Resolve the timestamp and the index of the first price column.
    let (timestamp, price_idx) = match format {
        FileFormat::CsiFutures | FileFormat::CsiExtended => {
            let date = parse_date(field(record, 0, line)?, "%Y%m%d", line)?;
            (bar_time(date), 1)
        }
        FileFormat::TradeStation => {
            let date = parse_date(field(record, 0, line)?, "%m/%d/%Y", line)?;
            if intraday {
                let time = parse_time(field(record, 1, line)?, "%H:%M", line)?;
                (date.and_time(time), 2)
            } else {
                (bar_time(date), 1)
            }
        }
        FileFormat::Pinnacle => {
            let date = parse_date(field(record, 0, line)?, "%m/%d/%Y", line)?;
            (bar_time(date), 1)
        }
        FileFormat::Pal => {
            let date = parse_date(field(record, 0, line)?, "%Y%m%d", line)?;
            if intraday {
                let time = parse_time(field(record, 1, line)?, "%H%M", line)?;
                (date.and_time(time), 2)
            } else {
                (bar_time(date), 1)
            }
        }
        FileFormat::WealthLab => {
            let raw = field(record, 0, line)?.trim();
            match raw.split_once(' ') {
                Some((d, t)) => {
                    let date = parse_date(d, "%Y%m%d", line)?;
                    let time = parse_time(t, "%H%M", line)?;
                    (date.and_time(time), 1)
                }
                None => (bar_time(parse_date(raw, "%Y%m%d", line)?), 1),
            }
        }
    };

    let open = parse_decimal(field(record, price_idx, line)?, line, "open")?;
    let high = parse_decimal(field(record, price_idx + 1, line)?, line, "high")?;
    let low = parse_decimal(field(record, price_idx + 2, line)?, line, "low")?;
    let close = parse_decimal(field(record, price_idx + 3, line)?, line, "close")?;

    let volume = match format {
        // TradeStation intraday splits volume into up/down ticks.
        FileFormat::TradeStation if intraday => {
            let up = parse_decimal(field(record, price_idx + 4, line)?, line, "up volume")?;
            let down = parse_decimal(field(record, price_idx + 5, line)?, line, "down volume")?;
            up + down
        }
        // PAL files may omit the volume column entirely.
        FileFormat::Pal => match record.get(price_idx + 4) {
            Some(v) if !v.trim().is_empty() => parse_decimal(v, line, "volume")?,
            _ => Decimal::ZERO,
        },
        _ => parse_decimal(field(record, price_idx + 4, line)?, line, "volume")?,
    };

    Ok(RawBar {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Reads a whole data file into a series. Fails on the first malformed row,
/// invalid bar or duplicate timestamp; nothing is skipped silently.
pub fn read_series(
    path: &Path,
    format: FileFormat,
    time_frame: TimeFrame,
    volume_unit: VolumeUnit,
) -> Result<OhlcSeries<OrderedLookup>, PalError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(format.has_header())
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            PalError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            PalError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let raw = parse_record(&record, line, format, time_frame)?;
        let bar = OhlcBar::new(
            raw.timestamp,
            raw.open,
            raw.high,
            raw.low,
            raw.close,
            raw.volume,
            time_frame,
        )
        .map_err(DataError::from)?;
        bars.push(bar);
    }

    Ok(OhlcSeries::new_from_range(time_frame, volume_unit, bars)?)
}
