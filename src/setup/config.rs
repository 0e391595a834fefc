use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::data::FileFormat;
use crate::error::ConfigError;
use crate::num::Decimal;
use crate::timeseries::TimeFrame;

/// Derived series the setup can emit instead of raw OHLC in-sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    Ibs,
}

impl Indicator {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "IBS" => Ok(Indicator::Ibs),
            other => Err(ConfigError::UnsupportedIndicator(other.to_string())),
        }
    }
}

fn validate_split_total<'a>(
    in_sample: &'a f64,
    out_of_sample: &'a f64,
) -> impl FnOnce(&f64, &()) -> garde::Result + 'a {
    move |reserved: &f64, (): &()| {
        let total = in_sample + out_of_sample + reserved;
        if total > 100.0 {
            return Err(garde::Error::new(format!(
                "split percentages total {total}%, over 100%"
            )));
        }
        Ok(())
    }
}

/// Everything the setup engine needs to know, validated before any work
/// starts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetupConfig {
    #[garde(length(min = 1))]
    pub ticker: String,
    #[garde(skip)]
    pub time_frame: TimeFrame,
    /// Bar spacing for intraday data; ignored for other frames.
    #[garde(range(min = 1, max = 1440))]
    pub intraday_minutes: u32,
    #[garde(skip)]
    pub file_format: FileFormat,
    #[garde(skip)]
    pub indicator: Option<Indicator>,
    #[garde(range(min = 0.0, max = 100.0))]
    pub in_sample_pct: f64,
    #[garde(range(min = 0.0, max = 100.0))]
    pub out_of_sample_pct: f64,
    #[garde(
        range(min = 0.0, max = 100.0),
        custom(validate_split_total(&self.in_sample_pct, &self.out_of_sample_pct))
    )]
    pub reserved_pct: f64,
    #[garde(range(min = 1))]
    pub holding_period: u32,
    #[garde(skip)]
    pub stats_only: bool,
    /// Exchange tick when known; zero means "infer from the data".
    #[garde(skip)]
    pub security_tick: Decimal,
}

impl SetupConfig {
    /// Defaults: 60/40/0 split, one-bar holding period, 90-minute intraday
    /// bars, one-cent equity tick.
    pub fn new(ticker: impl Into<String>, time_frame: TimeFrame, file_format: FileFormat) -> Self {
        SetupConfig {
            ticker: ticker.into(),
            time_frame,
            intraday_minutes: 90,
            file_format,
            indicator: None,
            in_sample_pct: 60.0,
            out_of_sample_pct: 40.0,
            reserved_pct: 0.0,
            holding_period: 1,
            stats_only: false,
            security_tick: "0.01".parse().expect("constant parses"),
        }
    }

    /// The typed check the engine runs regardless of how the config was
    /// constructed.
    pub fn validate_percentages(&self) -> Result<(), ConfigError> {
        let parts = [self.in_sample_pct, self.out_of_sample_pct, self.reserved_pct];
        if parts.iter().any(|p| *p < 0.0) || parts.iter().sum::<f64>() > 100.0 {
            return Err(ConfigError::PercentagesExceed100 {
                in_sample: self.in_sample_pct,
                out_of_sample: self.out_of_sample_pct,
                reserved: self.reserved_pct,
            });
        }
        Ok(())
    }

    /// Directory name distinguishing intraday runs by bar spacing.
    pub fn time_frame_dir_name(&self) -> String {
        if self.time_frame == TimeFrame::Intraday {
            format!("Intraday_{}", self.intraday_minutes)
        } else {
            self.time_frame.to_string()
        }
    }

    /// File-format tag for the downstream validator's manifest.
    pub fn manifest_format(&self) -> &'static str {
        if self.time_frame == TimeFrame::Intraday {
            "INTRADAY::TRADESTATION"
        } else {
            "PAL"
        }
    }
}
