#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

/// Deterministic daily closes on a 0.001 grid around $25-$27 with two-sided
/// moves: every consecutive move is either +0.371 or -1.629, so the return
/// distribution has plenty of mass on both sides and the clean-start window
/// accepts the series immediately.
pub fn synthetic_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 25.0 + ((i * 37) % 200) as f64 * 0.01 + i as f64 * 0.001)
        .collect()
}

/// Writes a PAL EOD data file (`YYYYMMDD,O,H,L,C,V`, CRLF) with one bar per
/// calendar day starting 2015-01-01.
pub fn write_pal_eod_file(path: &Path, closes: &[f64]) {
    let mut out = std::fs::File::create(path).unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    for (i, close) in closes.iter().enumerate() {
        let date = start + chrono::TimeDelta::days(i as i64);
        write!(
            out,
            "{},{:.3},{:.3},{:.3},{:.3},1000\r\n",
            date.format("%Y%m%d"),
            close - 0.2,
            close + 0.5,
            close - 0.5,
            close
        )
        .unwrap();
    }
}
