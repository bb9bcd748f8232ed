use crate::fleet::MIN_AVAILABLE_BATTERY;
use crate::order::{Order, OrderStatus};
use crate::warehouse::{InventoryView, WarehouseState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommendation derived from a state view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recommendation {
    Restock {
        message: String,
        items: Vec<InventoryView>,
    },
    AgvAvailability {
        message: String,
        suggestion: String,
    },
    LowBattery {
        message: String,
        agv_ids: Vec<String>,
    },
    OrderProcessing {
        message: String,
        orders: Vec<Order>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub inventory_items: usize,
    pub items_below_threshold: usize,
    pub agvs: usize,
    pub available_agvs: usize,
    pub low_battery_agvs: usize,
    pub pending_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub timestamp: DateTime<Utc>,
    pub recommendations: Vec<Recommendation>,
    pub summary: AnalysisSummary,
}

pub fn analyze(state: &WarehouseState) -> Analysis {
    let below: Vec<InventoryView> = state
        .inventory
        .iter()
        .filter(|view| view.needs_restock)
        .cloned()
        .collect();
    let available = state.agvs.iter().filter(|view| view.is_available).count();
    let low_battery: Vec<String> = state
        .agvs
        .iter()
        .filter(|view| view.agv.battery_level <= MIN_AVAILABLE_BATTERY)
        .map(|view| view.agv.agv_id.clone())
        .collect();
    let pending: Vec<Order> = state
        .orders
        .iter()
        .filter(|order| order.status == OrderStatus::Pending)
        .cloned()
        .collect();

    let summary = AnalysisSummary {
        inventory_items: state.inventory.len(),
        items_below_threshold: below.len(),
        agvs: state.agvs.len(),
        available_agvs: available,
        low_battery_agvs: low_battery.len(),
        pending_orders: pending.len(),
    };

    let mut recommendations = Vec::new();
    if !below.is_empty() {
        recommendations.push(Recommendation::Restock {
            message: format!("{} items need restocking", below.len()),
            items: below,
        });
    }
    if available == 0 {
        recommendations.push(Recommendation::AgvAvailability {
            message: "No AGVs are currently available".to_string(),
            suggestion: "Consider freeing up AGVs or adding more to the fleet".to_string(),
        });
    }
    if !low_battery.is_empty() {
        recommendations.push(Recommendation::LowBattery {
            message: format!("{} AGVs need charging", low_battery.len()),
            agv_ids: low_battery,
        });
    }
    if !pending.is_empty() {
        recommendations.push(Recommendation::OrderProcessing {
            message: format!("{} orders are pending", pending.len()),
            orders: pending,
        });
    }

    Analysis {
        timestamp: Utc::now(),
        recommendations,
        summary,
    }
}
