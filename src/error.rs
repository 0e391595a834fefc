use thiserror::Error;

/// Data-layer failures: container invariants, lookup misses, estimator
/// preconditions. These are hard errors; the containers never skip silently.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("duplicate timestamp {0}")]
    DuplicateTimestamp(chrono::NaiveDateTime),

    #[error("invalid bar at {timestamp}: {reason}")]
    InvalidBar {
        timestamp: chrono::NaiveDateTime,
        reason: String,
    },

    #[error("bar time frame {bar:?} does not match series time frame {series:?}")]
    TimeFrameMismatch {
        bar: crate::timeseries::TimeFrame,
        series: crate::timeseries::TimeFrame,
    },

    #[error("no entry found: {0}")]
    NotFound(String),

    #[error("offset {offset} from {base} is outside the series")]
    OffsetOutOfRange {
        base: chrono::NaiveDateTime,
        offset: i64,
    },

    #[error("operation requires an {expected:?} series, got {actual:?}")]
    WrongTimeFrame {
        expected: crate::timeseries::TimeFrame,
        actual: crate::timeseries::TimeFrame,
    },

    #[error("insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("no positive gap between consecutive timestamps")]
    NoPositiveGap,

    #[error("filter range starts at {start}, before the first entry {first}")]
    RangeBeforeSeries {
        start: chrono::NaiveDateTime,
        first: chrono::NaiveDateTime,
    },
}

/// Configuration failures surfaced before any computation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown time frame '{0}'")]
    UnknownTimeFrame(String),

    #[error("in-sample {in_sample}% + out-of-sample {out_of_sample}% + reserved {reserved}% exceeds 100%")]
    PercentagesExceed100 {
        in_sample: f64,
        out_of_sample: f64,
        reserved: f64,
    },

    #[error("no clean start window found in {0} bars")]
    NoCleanStart(usize),

    #[error("unsupported indicator '{0}'")]
    UnsupportedIndicator(String),

    #[error("unknown file format tag {0} (expected 1-6)")]
    UnknownFileFormat(String),
}

/// A syntax error from the pattern IR parser, with a file-relative location.
#[derive(Debug, Error)]
#[error("{line}:{column}: expected {expected}, found {found}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub expected: String,
    pub found: String,
}

/// Top-level error for the crate.
#[derive(Debug, Error)]
pub enum PalError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("syntax error at {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = PalError> = std::result::Result<T, E>;
