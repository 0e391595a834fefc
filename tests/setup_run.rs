//! End-to-end tests for the setup engine: artifact tree shape, file
//! contents, split arithmetic and idempotence, all on a deterministic
//! synthetic series (600 daily bars, clean from bar 0, so the buffered clean
//! start lands at bar 20 and 580 bars remain usable).

mod common;

use std::path::Path;

use palkit::data::FileFormat;
use palkit::num::Decimal;
use palkit::setup::{Indicator, SetupConfig, SetupEngine, NUM_WORKER_DIRS};
use palkit::timeseries::TimeFrame;

const BARS: usize = 600;

fn run_setup(config: SetupConfig) -> (tempfile::TempDir, palkit::setup::SetupReport) {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("TST.txt");
    common::write_pal_eod_file(&data_path, &common::synthetic_closes(BARS));
    let engine = SetupEngine::new(config, dir.path().to_path_buf());
    let report = engine.run(&data_path).unwrap();
    (dir, report)
}

fn base_config() -> SetupConfig {
    SetupConfig::new("TST", TimeFrame::Daily, FileFormat::Pal)
}

fn read_trs(path: &Path) -> (Decimal, Decimal) {
    let content = std::fs::read_to_string(path).unwrap();
    let mut lines = content.split("\r\n");
    let target: Decimal = lines.next().unwrap().parse().unwrap();
    let stop: Decimal = lines.next().unwrap().parse().unwrap();
    (target, stop)
}

#[test]
fn artifact_tree_has_every_expected_file() {
    let (_dir, report) = run_setup(base_config());
    let base = report.artifacts_dir.as_ref().unwrap();
    let roc = base.join("Daily").join("Roc1");

    for i in 1..=NUM_WORKER_DIRS {
        let worker = roc.join("PAL_Files").join(format!("pal_{i}"));
        assert!(worker.join("TST_IS.txt").is_file());
        for ratio in ["0_5", "1_0", "2_0"] {
            for side in ["LONG", "SHORT"] {
                assert!(
                    worker.join(format!("TST_{ratio}_{side}.TRS")).is_file(),
                    "missing TST_{ratio}_{side}.TRS in pal_{i}"
                );
            }
        }
    }

    let val = roc.join("Validation_Files");
    for ratio in ["0_5", "1_0", "2_0"] {
        let rr = val.join(format!("Risk_Reward_{ratio}"));
        assert!(rr.join("TST_ALL.txt").is_file());
        assert!(rr.join("TST_config.csv").is_file());
    }
    assert!(val.join("TST_OOS.txt").is_file());
    assert!(val.join("TST_Palsetup_Details.txt").is_file());
    // Reserved defaults to 0%, so no reserved file.
    assert!(!val.join("TST_reserved.txt").exists());
}

#[test]
fn split_sizes_follow_floor_semantics() {
    let mut config = base_config();
    config.in_sample_pct = 50.0;
    config.out_of_sample_pct = 30.0;
    config.reserved_pct = 20.0;
    let (_dir, report) = run_setup(config);

    // Clean start at bar 20 leaves 580 usable bars.
    assert_eq!(report.clean_start.start_index, 20);
    let usable = BARS - 20;
    let expected_is = (usable as f64 * 0.5).floor() as usize;
    let expected_oos = (usable as f64 * 0.3).floor() as usize;
    assert_eq!(report.split.in_sample.num_entries(), expected_is);
    assert_eq!(report.split.out_of_sample.num_entries(), expected_oos);
    assert_eq!(
        report.split.reserved.num_entries(),
        usable - expected_is - expected_oos
    );

    // Chronological order: in-sample ends before out-of-sample begins.
    assert!(
        report.split.in_sample.last_timestamp().unwrap()
            < report.split.out_of_sample.first_timestamp().unwrap()
    );
    assert!(
        report.split.out_of_sample.last_timestamp().unwrap()
            < report.split.reserved.first_timestamp().unwrap()
    );

    let val = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily")
        .join("Roc1")
        .join("Validation_Files");
    assert!(val.join("TST_reserved.txt").is_file());
}

#[test]
fn trs_files_scale_the_target_and_share_the_stop() {
    let (_dir, report) = run_setup(base_config());
    let worker = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/PAL_Files/pal_1");

    let (t_half, s_half) = read_trs(&worker.join("TST_0_5_LONG.TRS"));
    let (t_full, s_full) = read_trs(&worker.join("TST_1_0_LONG.TRS"));
    let (t_double, s_double) = read_trs(&worker.join("TST_2_0_LONG.TRS"));

    assert_eq!(t_full, report.long.profit_target);
    assert_eq!(t_half, t_full * "0.5".parse().unwrap());
    assert_eq!(t_double, t_full * Decimal::TWO);
    assert_eq!(s_half, s_full);
    assert_eq!(s_double, s_full);
    assert_eq!(s_full, report.long.stop);
    assert!(t_full > Decimal::ZERO && s_full > Decimal::ZERO);

    let (t_short, s_short) = read_trs(&worker.join("TST_1_0_SHORT.TRS"));
    assert_eq!(t_short, report.short.profit_target);
    assert_eq!(s_short, report.short.stop);
}

#[test]
fn config_manifest_is_positional_and_dated() {
    let (_dir, report) = run_setup(base_config());
    let rr = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/Validation_Files/Risk_Reward_1_0");
    let content = std::fs::read_to_string(rr.join("TST_config.csv")).unwrap();
    let line = content.lines().next().unwrap();
    let fields: Vec<&str> = line.split(',').collect();
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[0], "TST");
    assert_eq!(fields[1], "./TST_IR.txt");
    assert_eq!(fields[2], "./TST_ALL.txt");
    assert_eq!(fields[3], "PAL");
    for date_field in &fields[4..8] {
        assert_eq!(date_field.len(), 8, "EOD dates are YYYYMMDD: {date_field}");
        assert!(date_field.chars().all(|c| c.is_ascii_digit()));
    }
    assert_eq!(fields[8], "Daily");

    // The manifest dates match the split boundaries.
    let is_start = report
        .split
        .in_sample
        .first_date()
        .unwrap()
        .format("%Y%m%d")
        .to_string();
    assert_eq!(fields[4], is_start);
}

#[test]
fn deterministic_outputs_are_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("TST.txt");
    common::write_pal_eod_file(&data_path, &common::synthetic_closes(BARS));
    let engine = SetupEngine::new(base_config(), dir.path().to_path_buf());

    let first = engine.run(&data_path).unwrap();
    let trs = first
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/PAL_Files/pal_3/TST_1_0_LONG.TRS");
    let manifest = first
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/Validation_Files/Risk_Reward_0_5/TST_config.csv");
    let trs_bytes = std::fs::read(&trs).unwrap();
    let manifest_bytes = std::fs::read(&manifest).unwrap();

    engine.run(&data_path).unwrap();
    assert_eq!(std::fs::read(&trs).unwrap(), trs_bytes);
    assert_eq!(std::fs::read(&manifest).unwrap(), manifest_bytes);
}

#[test]
fn stats_only_mode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("TST.txt");
    common::write_pal_eod_file(&data_path, &common::synthetic_closes(BARS));
    let mut config = base_config();
    config.stats_only = true;
    let engine = SetupEngine::new(config, dir.path().to_path_buf());
    let report = engine.run(&data_path).unwrap();

    assert!(report.artifacts_dir.is_none());
    assert!(!dir.path().join("TST_Validation").exists());
    let summary = report.summary();
    assert!(summary.contains("Profit Target"));
    assert!(summary.contains("CleanStartIndex = 20"));
}

#[test]
fn indicator_mode_replaces_volume_with_ibs() {
    let mut config = base_config();
    config.indicator = Some(Indicator::Ibs);
    let (_dir, report) = run_setup(config);

    let is_file = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/PAL_Files/pal_1/TST_IS.txt");
    let content = std::fs::read_to_string(is_file).unwrap();
    let mut lines = 0;
    for line in content.split("\r\n").filter(|l| !l.is_empty()) {
        let last = line.rsplit(',').next().unwrap();
        let value: Decimal = last.parse().unwrap();
        assert!(value >= Decimal::ZERO && value <= Decimal::ONE, "IBS out of range: {line}");
        lines += 1;
    }
    assert_eq!(lines, report.split.in_sample.num_entries());
}

#[test]
fn details_file_reports_all_sections() {
    let (_dir, report) = run_setup(base_config());
    let details = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/Validation_Files/TST_Palsetup_Details.txt");
    let content = std::fs::read_to_string(details).unwrap();
    for needle in [
        "=== Date Ranges ===",
        "=== Long Position Statistics ===",
        "=== Short Position Statistics ===",
        "=== Clean Start Information ===",
        "=== Bid/Ask Spread Analysis (Out-of-Sample) ===",
        "Corwin-Schultz Spread Estimator:",
        "Edge (30-day window) Spread Estimator:",
        "Long Profitability =",
        "InferredTick",
    ] {
        assert!(content.contains(needle), "details file missing '{needle}'");
    }
}

#[test]
fn over_allocated_split_aborts_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("TST.txt");
    common::write_pal_eod_file(&data_path, &common::synthetic_closes(BARS));
    let mut config = base_config();
    config.reserved_pct = 50.0; // 60 + 40 + 50 > 100
    let engine = SetupEngine::new(config, dir.path().to_path_buf());
    let err = engine.run(&data_path).unwrap_err();
    assert!(matches!(
        err,
        palkit::PalError::Config(palkit::ConfigError::PercentagesExceed100 { .. })
    ));
    assert!(!dir.path().join("TST_Validation").exists());
}

#[test]
fn all_file_matches_the_complete_input() {
    let (_dir, report) = run_setup(base_config());
    let rr = report
        .artifacts_dir
        .as_ref()
        .unwrap()
        .join("Daily/Roc1/Validation_Files/Risk_Reward_2_0");
    let reread = palkit::data::read_series(
        &rr.join("TST_ALL.txt"),
        FileFormat::Pal,
        TimeFrame::Daily,
        palkit::timeseries::VolumeUnit::Shares,
    )
    .unwrap();
    assert_eq!(reread, report.split.complete);
}
