use super::config::SnapshotConfig;
use super::recovery::{list_snapshots, load_latest_snapshot};
use super::WarehouseSnapshot;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Persistence collaborator.
///
/// Callers log failures; a failed save never fails the action that
/// triggered it.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &WarehouseSnapshot) -> Result<()>;

    /// Newest loadable snapshot, if any
    fn load_latest(&self) -> Result<Option<WarehouseSnapshot>>;
}

/// Snapshots as rotated gzip files in one directory
pub struct FileSnapshotStore {
    config: SnapshotConfig,
}

impl FileSnapshotStore {
    /// Create the store, creating its directory if needed
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        fs::create_dir_all(&config.directory).with_context(|| {
            format!(
                "Failed to create snapshot directory {}",
                config.directory.display()
            )
        })?;

        info!(
            directory = %config.directory.display(),
            keep_count = config.keep_count,
            "Snapshot store ready"
        );

        Ok(Self { config })
    }

    /// File path for a revision.
    ///
    /// Format: snapshot-{timestamp}-rev{revision}.json.gz
    /// Example: snapshot-20260212T153045.123Z-rev0000000042.json.gz
    fn snapshot_path(&self, revision: u64) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let filename = format!("snapshot-{}-rev{:010}.json.gz", timestamp, revision);
        self.config.directory.join(filename)
    }

    /// Delete old snapshots, keeping only the most recent N
    fn cleanup_old_snapshots(&self) -> Result<()> {
        let mut snapshots = list_snapshots(&self.config.directory)?;
        if snapshots.len() <= self.config.keep_count {
            return Ok(());
        }

        // Timestamp then revision, both lexicographically sortable
        snapshots.sort();

        let delete_count = snapshots.len() - self.config.keep_count;
        for path in &snapshots[..delete_count] {
            if let Err(e) = fs::remove_file(path) {
                error!(error = %e, path = %path.display(), "Failed to delete old snapshot");
            } else {
                info!(path = %path.display(), "Deleted old snapshot");
            }
        }

        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &WarehouseSnapshot) -> Result<()> {
        let path = self.snapshot_path(snapshot.revision);
        snapshot.save_to_file(&path)?;

        info!(
            revision = snapshot.revision,
            records = snapshot.record_count(),
            path = %path.display(),
            "Snapshot saved"
        );

        self.cleanup_old_snapshots()
    }

    fn load_latest(&self) -> Result<Option<WarehouseSnapshot>> {
        load_latest_snapshot(&self.config.directory)
    }
}
