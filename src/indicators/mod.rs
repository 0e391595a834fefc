//! Pure derived-series functions: returns, robust statistics, bar-strength,
//! spread estimators, volatility ranks and stop/target widths. Nothing here
//! mutates its inputs; outputs carry the input's time frame.

pub mod ibs;
pub mod scale;
pub mod skew;
pub mod spread;
pub mod stats;
pub mod stops;
pub mod volatility;

pub use ibs::{ibs, ibs1_series};
pub use scale::robust_qn;
pub use skew::medcouple_skew;
pub use spread::{
    corwin_schultz_average, corwin_schultz_dollar_pair, corwin_schultz_dollar_spreads,
    corwin_schultz_pair, corwin_schultz_spreads, corwin_schultz_spreads_with_window, edge_spreads,
    NegativePolicy, CORWIN_SCHULTZ_WINDOW, EDGE_WINDOW,
};
pub use stats::{mean_of_slice, median, median_absolute_deviation, median_of_slice, roc_series, std_dev};
pub use stops::{
    compute_long_stop_target, compute_robust_stop_target, compute_short_stop_target,
    partition_returns, MIN_PARTITION,
};
pub use volatility::{
    adaptive_volatility_percent_rank, annualized_volatility_series, percent_rank_series,
    standard_percent_rank_period, VOLATILITY_PERIOD,
};
