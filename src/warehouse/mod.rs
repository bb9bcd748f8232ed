// Warehouse floor: inventory + fleet + locations + stats under one lock

mod state;

pub use state::{AgvView, InventoryView, WarehouseState};

use crate::allocation::{AllocationEngine, SelectionPolicy};
use crate::fleet::FleetRegistry;
use crate::inventory::InventoryLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Where warehouse-level charging is allowed, and the agv agent charges
pub const CHARGING_STATION: &str = "charging_station";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Dock,
    Storage,
    Workstation,
    Charging,
}

/// Named place on the floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub capacity: u32,
}

impl Location {
    pub fn new(name: impl Into<String>, kind: LocationKind, capacity: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            capacity,
        }
    }
}

/// Fixed layout of the floor
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("receiving", LocationKind::Dock, 10),
        Location::new("shipping", LocationKind::Dock, 10),
        Location::new("storage_a", LocationKind::Storage, 100),
        Location::new("storage_b", LocationKind::Storage, 100),
        Location::new("storage_c", LocationKind::Storage, 100),
        Location::new("picking_station", LocationKind::Workstation, 5),
        Location::new("packing_station", LocationKind::Workstation, 5),
        Location::new(CHARGING_STATION, LocationKind::Charging, 3),
    ]
}

/// Counters bumped by warehouse-level actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStats {
    pub orders_processed: u64,
    pub items_picked: u64,
    pub items_restocked: u64,
    pub agv_movements: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for WarehouseStats {
    fn default() -> Self {
        Self {
            orders_processed: 0,
            items_picked: 0,
            items_restocked: 0,
            agv_movements: 0,
            last_updated: Utc::now(),
        }
    }
}

impl WarehouseStats {
    pub fn record_movement(&mut self) {
        self.agv_movements += 1;
        self.last_updated = Utc::now();
    }

    pub fn record_pick(&mut self, quantity: u32) {
        self.items_picked += u64::from(quantity);
        self.last_updated = Utc::now();
    }

    pub fn record_restock(&mut self, quantity: u32) {
        self.items_restocked += u64::from(quantity);
        self.last_updated = Utc::now();
    }

    pub fn record_order_processed(&mut self) {
        self.orders_processed += 1;
        self.last_updated = Utc::now();
    }
}

/// State mutated together by multi-step protocols
#[derive(Debug)]
pub struct Floor {
    pub name: String,
    pub inventory: InventoryLedger,
    pub fleet: FleetRegistry,
    pub stats: WarehouseStats,
    locations: Vec<Location>,
}

impl Floor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inventory: InventoryLedger::new(),
            fleet: FleetRegistry::new(),
            stats: WarehouseStats::default(),
            locations: default_locations(),
        }
    }

    /// Allocation engine over this floor's ledger and fleet
    pub fn engine<'a>(&'a mut self, policy: &'a dyn SelectionPolicy) -> AllocationEngine<'a> {
        AllocationEngine::new(&mut self.inventory, &mut self.fleet, policy)
    }

    /// Committed ledger and fleet changes, for change detection
    pub fn writes(&self) -> u64 {
        self.inventory.writes() + self.fleet.writes()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn has_location(&self, name: &str) -> bool {
        self.location(name).is_some()
    }
}
