use super::WarehouseSnapshot;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Load the most recent valid snapshot from a directory.
///
/// Returns None if the directory is missing, empty, or holds only corrupt
/// snapshots. Tries newest to oldest; a snapshot whose records fail ledger
/// validation counts as corrupt.
pub fn load_latest_snapshot(snapshot_dir: &Path) -> Result<Option<WarehouseSnapshot>> {
    if !snapshot_dir.exists() {
        info!(
            directory = %snapshot_dir.display(),
            "Snapshot directory does not exist, starting without snapshot"
        );
        return Ok(None);
    }

    let mut snapshots = list_snapshots(snapshot_dir)?;
    if snapshots.is_empty() {
        info!("No snapshots found, starting fresh");
        return Ok(None);
    }

    snapshots.sort_by(|a, b| b.cmp(a));

    info!(
        count = snapshots.len(),
        directory = %snapshot_dir.display(),
        "Found snapshots, attempting to load newest"
    );

    for path in snapshots {
        let loaded = WarehouseSnapshot::load_from_file(&path).and_then(|snapshot| {
            snapshot
                .validate()
                .context("Snapshot violates ledger invariants")?;
            Ok(snapshot)
        });
        match loaded {
            Ok(snapshot) => {
                info!(
                    path = %path.display(),
                    revision = snapshot.revision,
                    records = snapshot.record_count(),
                    "Loaded snapshot"
                );
                return Ok(Some(snapshot));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt snapshot, trying next oldest"
                );
            }
        }
    }

    error!("All snapshots are corrupt, starting fresh");
    Ok(None)
}

/// Snapshot files (`snapshot-*.json.gz`) in a directory, unordered
pub(crate) fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(snapshot_dir).context("Failed to read snapshot directory")?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if filename.starts_with("snapshot-") && filename.ends_with(".json.gz") {
                    snapshots.push(path);
                }
            }
        }
    }

    Ok(snapshots)
}
