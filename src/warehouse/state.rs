use super::{Floor, Location, WarehouseStats};
use crate::fleet::Agv;
use crate::inventory::InventoryItem;
use crate::order::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub needs_restock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgvView {
    #[serde(flatten)]
    pub agv: Agv,
    pub is_available: bool,
}

/// Read-only view of the whole warehouse at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseState {
    pub name: String,
    pub inventory: Vec<InventoryView>,
    pub agvs: Vec<AgvView>,
    /// Active orders only
    pub orders: Vec<Order>,
    pub locations: Vec<Location>,
    pub stats: WarehouseStats,
    pub timestamp: DateTime<Utc>,
}

impl WarehouseState {
    /// Capture the floor; `orders` should already be the active set
    pub fn capture(floor: &Floor, orders: Vec<Order>) -> Self {
        Self {
            name: floor.name.clone(),
            inventory: floor
                .inventory
                .items()
                .iter()
                .map(|item| InventoryView {
                    needs_restock: item.needs_restock(),
                    item: item.clone(),
                })
                .collect(),
            agvs: floor
                .fleet
                .agvs()
                .iter()
                .map(|agv| AgvView {
                    is_available: agv.is_available(),
                    agv: agv.clone(),
                })
                .collect(),
            orders,
            locations: floor.locations().to_vec(),
            stats: floor.stats.clone(),
            timestamp: Utc::now(),
        }
    }
}
