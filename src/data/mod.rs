//! External data interfaces: vendor-format readers and artifact writers.

pub mod readers;
pub mod writers;

pub use readers::{read_series, FileFormat};
pub use writers::{
    write_eod_series, write_intraday_series, write_series, write_series_with_indicator,
};
