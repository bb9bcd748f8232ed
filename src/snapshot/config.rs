use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot persistence settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Persist after every successful mutating action
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Number of snapshots to keep (oldest deleted first)
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,

    /// Load the newest snapshot on startup
    #[serde(default = "default_enabled")]
    pub recover_on_start: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("data/snapshots")
}

fn default_keep_count() -> usize {
    10
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: default_directory(),
            keep_count: default_keep_count(),
            recover_on_start: default_enabled(),
        }
    }
}
