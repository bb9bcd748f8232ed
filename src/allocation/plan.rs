use crate::fleet::Agv;
use crate::inventory::{InventoryItem, InventoryLedger};
use serde::{Deserialize, Serialize};

/// One step of a restock plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    MoveAgvToReceiving {
        agv_id: String,
        destination: String,
    },
    LoadInventory {
        agv_id: String,
        product_id: String,
        quantity: u32,
    },
    MoveAgvToStorage {
        agv_id: String,
        destination: String,
    },
    UnloadInventory {
        agv_id: String,
        product_id: String,
        quantity: u32,
    },
}

impl PlanStep {
    pub fn name(&self) -> &'static str {
        match self {
            PlanStep::MoveAgvToReceiving { .. } => "move_agv_to_receiving",
            PlanStep::LoadInventory { .. } => "load_inventory",
            PlanStep::MoveAgvToStorage { .. } => "move_agv_to_storage",
            PlanStep::UnloadInventory { .. } => "unload_inventory",
        }
    }
}

/// Agent-bound restock plan. Descriptive only; never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestockPlan {
    pub product_id: String,
    pub product_name: String,
    pub current_quantity: u32,
    pub restock_amount: u32,
    pub location: String,
    pub agv_id: String,
    pub agv_name: String,
    pub agv_location: String,
    pub steps: Vec<PlanStep>,
}

impl RestockPlan {
    pub(crate) fn build(item: &InventoryItem, agv: &Agv, receiving: &str) -> Self {
        let restock_amount = item.headroom();
        let steps = vec![
            PlanStep::MoveAgvToReceiving {
                agv_id: agv.agv_id.clone(),
                destination: receiving.to_string(),
            },
            PlanStep::LoadInventory {
                agv_id: agv.agv_id.clone(),
                product_id: item.product_id.clone(),
                quantity: restock_amount,
            },
            PlanStep::MoveAgvToStorage {
                agv_id: agv.agv_id.clone(),
                destination: item.location.clone(),
            },
            PlanStep::UnloadInventory {
                agv_id: agv.agv_id.clone(),
                product_id: item.product_id.clone(),
                quantity: restock_amount,
            },
        ];

        Self {
            product_id: item.product_id.clone(),
            product_name: item.name.clone(),
            current_quantity: item.quantity,
            restock_amount,
            location: item.location.clone(),
            agv_id: agv.agv_id.clone(),
            agv_name: agv.name.clone(),
            agv_location: agv.location.clone(),
            steps,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RestockOutcome {
    /// Item is above its threshold; nothing was selected or mutated
    NotNeeded,
    Planned(RestockPlan),
}

/// Entry of the restock-needs report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestockNeed {
    pub product_id: String,
    pub name: String,
    pub current_quantity: u32,
    pub min_threshold: u32,
    pub restock_amount: u32,
    pub location: String,
    pub priority: u8,
}

/// Restock urgency in `1..=10`.
///
/// Out of stock scores 10; otherwise the deficit relative to the threshold
/// is scaled to `1..=9`.
pub fn restock_priority(item: &InventoryItem) -> u8 {
    if item.quantity == 0 {
        return 10;
    }
    if item.min_threshold == 0 {
        return 1;
    }

    let threshold = f64::from(item.min_threshold);
    let deficit = (threshold - f64::from(item.quantity)) / threshold;
    (deficit * 10.0).round().clamp(1.0, 9.0) as u8
}

/// Items needing restock, most urgent first.
///
/// Ties keep ledger order.
pub fn restock_needs(inventory: &InventoryLedger) -> Vec<RestockNeed> {
    let mut needs: Vec<RestockNeed> = inventory
        .items_below_threshold()
        .into_iter()
        .map(|item| RestockNeed {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            current_quantity: item.quantity,
            min_threshold: item.min_threshold,
            restock_amount: item.headroom(),
            location: item.location.clone(),
            priority: restock_priority(item),
        })
        .collect();

    // sort_by is stable
    needs.sort_by(|a, b| b.priority.cmp(&a.priority));
    needs
}

/// Direct route from the agent's current location
pub fn plan_route(agv: &Agv, destination: &str) -> Vec<String> {
    vec![agv.location.clone(), destination.to_string()]
}
