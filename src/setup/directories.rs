//! Artifact-tree layout for a validation run.
//!
//! ```text
//! <ticker>_Validation/
//!   <TimeFrame>/                    Daily | Weekly | ... | Intraday_<min>
//!     Roc<holding-period>/
//!       PAL_Files/pal_1 .. pal_8    one copy of the mining inputs per worker
//!       Validation_Files/
//!         Risk_Reward_0_5 | _1_0 | _2_0
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::setup::config::SetupConfig;

/// Parallel mining workers the PAL inputs are replicated for.
pub const NUM_WORKER_DIRS: usize = 8;

/// Risk-reward directory suffixes, matching the target multipliers.
pub const RISK_REWARD_SUFFIXES: [&str; 3] = ["0_5", "1_0", "2_0"];

#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    pub base_dir: PathBuf,
    pub validation_dir: PathBuf,
    pub worker_dirs: Vec<PathBuf>,
    pub risk_reward_dirs: Vec<PathBuf>,
}

/// Builds the full tree under `root`, replacing any previous run for the
/// same ticker so repeated runs produce identical trees.
pub fn create_layout(root: &Path, config: &SetupConfig) -> io::Result<DirectoryLayout> {
    let base_dir = root.join(format!("{}_Validation", config.ticker));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir)?;
    }

    let roc_dir = base_dir
        .join(config.time_frame_dir_name())
        .join(format!("Roc{}", config.holding_period));
    let pal_dir = roc_dir.join("PAL_Files");
    let validation_dir = roc_dir.join("Validation_Files");

    let mut worker_dirs = Vec::with_capacity(NUM_WORKER_DIRS);
    for i in 1..=NUM_WORKER_DIRS {
        let dir = pal_dir.join(format!("pal_{i}"));
        fs::create_dir_all(&dir)?;
        worker_dirs.push(dir);
    }

    let mut risk_reward_dirs = Vec::with_capacity(RISK_REWARD_SUFFIXES.len());
    for suffix in RISK_REWARD_SUFFIXES {
        let dir = validation_dir.join(format!("Risk_Reward_{suffix}"));
        fs::create_dir_all(&dir)?;
        risk_reward_dirs.push(dir);
    }

    Ok(DirectoryLayout {
        base_dir,
        validation_dir,
        worker_dirs,
        risk_reward_dirs,
    })
}
