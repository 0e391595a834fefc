//! The setup engine: configuration, quantization analysis, partitioning and
//! artifact emission for a validation run.

pub mod config;
pub mod directories;
pub mod engine;
pub mod output;
pub mod quantization;

pub use config::{Indicator, SetupConfig};
pub use directories::{create_layout, DirectoryLayout, NUM_WORKER_DIRS, RISK_REWARD_SUFFIXES};
pub use engine::{
    split_series, SetupEngine, SetupReport, SideStatistics, SplitSeries, SpreadAnalysis,
    SpreadSummary,
};
pub use quantization::{
    estimate_effective_tick, estimate_tick_from_range, find_clean_start, window_parameters,
    CleanStartConfig, CleanStartResult, WindowParameters,
};
