use crate::error::CoreResult;
use crate::fleet::{Agv, FleetRegistry};
use crate::inventory::{InventoryItem, InventoryLedger};
use crate::order::{Order, OrderLedger};
use crate::warehouse::{Floor, WarehouseStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub mod config;
pub mod recovery;
mod store;

pub use store::{FileSnapshotStore, SnapshotStore};


/// Full warehouse state at one revision
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WarehouseSnapshot {
    /// Snapshot format version
    pub snapshot_version: String,

    pub created_at: DateTime<Utc>,

    /// Count of persisted mutations when the snapshot was taken
    pub revision: u64,

    pub name: String,
    pub inventory: Vec<InventoryItem>,
    pub agvs: Vec<Agv>,
    pub orders: Vec<Order>,
    pub stats: WarehouseStats,
}

impl WarehouseSnapshot {
    /// Capture the floor and every order, terminal ones included
    pub fn capture(floor: &Floor, orders: Vec<Order>, revision: u64) -> Self {
        Self {
            snapshot_version: "1".to_string(),
            created_at: Utc::now(),
            revision,
            name: floor.name.clone(),
            inventory: floor.inventory.items().to_vec(),
            agvs: floor.fleet.agvs().to_vec(),
            orders,
            stats: floor.stats.clone(),
        }
    }

    /// Replace live state with this snapshot's contents.
    ///
    /// Nothing is replaced unless every record passes ledger validation.
    pub fn apply(self, floor: &mut Floor, orders: &OrderLedger) -> CoreResult<()> {
        let mut inventory = InventoryLedger::new();
        inventory.restore(self.inventory)?;
        let mut fleet = FleetRegistry::new();
        fleet.restore(self.agvs)?;

        floor.name = self.name;
        floor.inventory = inventory;
        floor.fleet = fleet;
        floor.stats = self.stats;
        orders.restore(self.orders);
        Ok(())
    }

    /// Check records against the ledger invariants without applying them
    pub fn validate(&self) -> CoreResult<()> {
        InventoryLedger::new().restore(self.inventory.clone())?;
        FleetRegistry::new().restore(self.agvs.clone())?;
        Ok(())
    }

    /// Save as gzip-compressed JSON.
    ///
    /// Writes to a .tmp file, fsyncs, then renames, so a reader never sees a
    /// partial snapshot.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_vec(self).context("Failed to serialize snapshot to JSON")?;

        let tmp_path = path.with_extension("tmp");
        {
            let tmp_file =
                File::create(&tmp_path).context("Failed to create temporary snapshot file")?;

            let mut encoder = GzEncoder::new(tmp_file, Compression::default());
            encoder
                .write_all(&json)
                .context("Failed to write compressed snapshot data")?;

            let file = encoder.finish().context("Failed to finish compression")?;
            file.sync_all()
                .context("Failed to sync snapshot file to disk")?;
        }

        fs::rename(&tmp_path, path).context("Failed to rename temporary snapshot file")?;

        Ok(())
    }

    /// Load a gzip-compressed snapshot
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).context("Failed to open snapshot file")?;

        let mut decoder = GzDecoder::new(file);
        let mut json = String::new();
        decoder
            .read_to_string(&mut json)
            .context("Failed to decompress snapshot file")?;

        serde_json::from_str(&json).context("Failed to deserialize snapshot JSON")
    }

    pub fn record_count(&self) -> usize {
        self.inventory.len() + self.agvs.len() + self.orders.len()
    }
}
