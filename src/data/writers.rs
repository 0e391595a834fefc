//! Data-file writers for the validation artifact tree.
//!
//! All files terminate lines with CRLF to match the legacy consumers. EOD
//! lines carry `YYYYMMDD,O,H,L,C,V`; intraday lines carry
//! `YYYYMMDD,HHMM,O,H,L,C,V`. The indicator variants replace the volume
//! column with the indicator value.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::timeseries::{LookupPolicy, NumericSeries, OhlcBar, OhlcSeries, TimeFrame};

fn open(path: &Path) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn write_eod_line(out: &mut impl Write, bar: &OhlcBar) -> io::Result<()> {
    write!(
        out,
        "{},{},{},{},{},{}\r\n",
        bar.date().format("%Y%m%d"),
        bar.open(),
        bar.high(),
        bar.low(),
        bar.close(),
        bar.volume()
    )
}

fn write_intraday_line(out: &mut impl Write, bar: &OhlcBar) -> io::Result<()> {
    write!(
        out,
        "{},{},{},{},{},{},{}\r\n",
        bar.date().format("%Y%m%d"),
        bar.timestamp().format("%H%M"),
        bar.open(),
        bar.high(),
        bar.low(),
        bar.close(),
        bar.volume()
    )
}

pub fn write_eod_series<P: LookupPolicy>(path: &Path, series: &OhlcSeries<P>) -> io::Result<()> {
    let mut out = open(path)?;
    for bar in series.sorted_iter() {
        write_eod_line(&mut out, &bar)?;
    }
    out.flush()
}

pub fn write_intraday_series<P: LookupPolicy>(
    path: &Path,
    series: &OhlcSeries<P>,
) -> io::Result<()> {
    let mut out = open(path)?;
    for bar in series.sorted_iter() {
        write_intraday_line(&mut out, &bar)?;
    }
    out.flush()
}

/// Writes a series in the layout matching its time frame.
pub fn write_series<P: LookupPolicy>(path: &Path, series: &OhlcSeries<P>) -> io::Result<()> {
    if series.time_frame() == TimeFrame::Intraday {
        write_intraday_series(path, series)
    } else {
        write_eod_series(path, series)
    }
}

/// OHLC plus an indicator column; only bars with an indicator value are
/// written.
pub fn write_series_with_indicator<P: LookupPolicy>(
    path: &Path,
    series: &OhlcSeries<P>,
    indicator: &NumericSeries,
) -> io::Result<()> {
    let intraday = series.time_frame() == TimeFrame::Intraday;
    let mut out = open(path)?;
    for bar in series.sorted_iter() {
        let Ok(entry) = indicator.get(bar.timestamp()) else {
            continue;
        };
        if intraday {
            write!(
                out,
                "{},{},{},{},{},{},{}\r\n",
                bar.date().format("%Y%m%d"),
                bar.timestamp().format("%H%M"),
                bar.open(),
                bar.high(),
                bar.low(),
                bar.close(),
                entry.value()
            )?;
        } else {
            write!(
                out,
                "{},{},{},{},{},{}\r\n",
                bar.date().format("%Y%m%d"),
                bar.open(),
                bar.high(),
                bar.low(),
                bar.close(),
                entry.value()
            )?;
        }
    }
    out.flush()
}
