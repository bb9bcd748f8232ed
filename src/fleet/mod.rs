// Fleet registry: per-AGV mutable state

use crate::error::{CoreResult, WarehouseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;


/// Battery consumed by one move
pub const MOVE_BATTERY_COST: f64 = 5.0;

/// Battery consumed by one load or unload
pub const HANDLING_BATTERY_COST: f64 = 2.0;

/// Agents at or below this battery level are not eligible for new work
pub const MIN_AVAILABLE_BATTERY: f64 = 20.0;

pub const MAX_BATTERY: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgvStatus {
    Idle,
    Moving,
    Loading,
    Unloading,
    Charging,
    Maintenance,
}

/// Registry operation that passes through a transient status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetOp {
    Move,
    Load,
    Unload,
    Charge,
}

impl AgvStatus {
    /// Transient status entered when `op` starts from `self`.
    ///
    /// Load and unload require `Idle`; move and charge start from any status.
    /// Every operation completes back to `Idle` in the same registry call.
    pub fn begin(self, op: FleetOp) -> Option<AgvStatus> {
        match (op, self) {
            (FleetOp::Move, _) => Some(AgvStatus::Moving),
            (FleetOp::Charge, _) => Some(AgvStatus::Charging),
            (FleetOp::Load, AgvStatus::Idle) => Some(AgvStatus::Loading),
            (FleetOp::Unload, AgvStatus::Idle) => Some(AgvStatus::Unloading),
            (FleetOp::Load, _) | (FleetOp::Unload, _) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgvStatus::Idle => "idle",
            AgvStatus::Moving => "moving",
            AgvStatus::Loading => "loading",
            AgvStatus::Unloading => "unloading",
            AgvStatus::Charging => "charging",
            AgvStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for AgvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Automated guided vehicle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agv {
    /// Unique identifier (e.g., "AGV001")
    pub agv_id: String,

    pub name: String,

    /// Current location name
    pub location: String,

    /// Status after the last completed action
    pub status: AgvStatus,

    /// Battery percentage in `0.0..=100.0`
    pub battery_level: f64,

    /// Maximum total units carried at once
    pub max_capacity: f64,

    /// Carried units per product
    pub current_load: BTreeMap<String, u32>,

    pub last_updated: DateTime<Utc>,
}

impl Agv {
    pub fn new(
        agv_id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        battery_level: f64,
        max_capacity: f64,
    ) -> Self {
        Self {
            agv_id: agv_id.into(),
            name: name.into(),
            location: location.into(),
            status: AgvStatus::Idle,
            battery_level: battery_level.clamp(0.0, MAX_BATTERY),
            max_capacity,
            current_load: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Idle, charged above the floor, and carrying nothing
    pub fn is_available(&self) -> bool {
        self.status == AgvStatus::Idle
            && self.battery_level > MIN_AVAILABLE_BATTERY
            && self.current_load.is_empty()
    }

    pub fn load_total(&self) -> u64 {
        self.current_load.values().map(|&q| u64::from(q)).sum()
    }

    pub fn carried(&self, product_id: &str) -> u32 {
        self.current_load.get(product_id).copied().unwrap_or(0)
    }

    fn drain_battery(&mut self, cost: f64) {
        self.battery_level = (self.battery_level - cost).max(0.0);
    }

    fn finish(&mut self) {
        self.status = AgvStatus::Idle;
        self.last_updated = Utc::now();
    }
}

/// Owning store for the fleet, in registration order
#[derive(Debug, Default)]
pub struct FleetRegistry {
    agvs: Vec<Agv>,
    index: HashMap<String, usize>,
    writes: u64,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an agent; a replaced agent keeps its position
    pub fn register(&mut self, mut agv: Agv) -> CoreResult<()> {
        validate(&agv)?;

        agv.battery_level = agv.battery_level.clamp(0.0, MAX_BATTERY);
        agv.last_updated = Utc::now();
        match self.index.get(&agv.agv_id) {
            Some(&pos) => self.agvs[pos] = agv,
            None => {
                self.index.insert(agv.agv_id.clone(), self.agvs.len());
                self.agvs.push(agv);
            }
        }
        self.writes += 1;
        Ok(())
    }

    pub fn get(&self, agv_id: &str) -> Option<&Agv> {
        self.index.get(agv_id).map(|&pos| &self.agvs[pos])
    }

    /// All agents in registration order
    pub fn agvs(&self) -> &[Agv] {
        &self.agvs
    }

    pub fn len(&self) -> usize {
        self.agvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agvs.is_empty()
    }

    /// Count of committed changes since creation
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Agents eligible for new work, in registration order
    pub fn available(&self) -> Vec<&Agv> {
        self.agvs.iter().filter(|agv| agv.is_available()).collect()
    }

    /// Relocate an agent. Succeeds whenever the agent exists.
    pub fn move_to(&mut self, agv_id: &str, destination: &str) -> CoreResult<()> {
        let agv = self.get_mut(agv_id)?;
        agv.status = transient(agv, FleetOp::Move)?;
        agv.location = destination.to_string();
        agv.drain_battery(MOVE_BATTERY_COST);
        agv.finish();

        debug!(agv_id = %agv_id, location = %destination, battery = agv.battery_level, "AGV moved");
        self.writes += 1;
        Ok(())
    }

    /// Put `quantity` units of a product on an agent
    pub fn load(&mut self, agv_id: &str, product_id: &str, quantity: u32) -> CoreResult<()> {
        if quantity == 0 {
            return Err(WarehouseError::InvalidParameters(
                "Quantity to load must be positive".to_string(),
            ));
        }
        let agv = self.get_mut(agv_id)?;
        let status = transient(agv, FleetOp::Load)?;

        let total = agv.load_total() + u64::from(quantity);
        if total as f64 > agv.max_capacity {
            return Err(WarehouseError::PreconditionFailed(format!(
                "AGV {} cannot carry {} more units of {} (load: {}, capacity: {})",
                agv_id,
                quantity,
                product_id,
                agv.load_total(),
                agv.max_capacity
            )));
        }

        let carried = agv.carried(product_id).checked_add(quantity).ok_or_else(|| {
            WarehouseError::PreconditionFailed(format!(
                "AGV {} cannot carry {} more units of {} (carrying: {})",
                agv_id,
                quantity,
                product_id,
                agv.carried(product_id)
            ))
        })?;

        agv.status = status;
        agv.current_load.insert(product_id.to_string(), carried);
        agv.drain_battery(HANDLING_BATTERY_COST);
        agv.finish();

        debug!(agv_id = %agv_id, product_id = %product_id, quantity, "AGV loaded");
        self.writes += 1;
        Ok(())
    }

    /// Take units of a product off an agent.
    ///
    /// `None`, or a quantity at least the carried amount, removes the whole
    /// line. Returns the unloaded quantity.
    pub fn unload(
        &mut self,
        agv_id: &str,
        product_id: &str,
        quantity: Option<u32>,
    ) -> CoreResult<u32> {
        if quantity == Some(0) {
            return Err(WarehouseError::InvalidParameters(
                "Quantity to unload must be positive".to_string(),
            ));
        }
        let agv = self.get_mut(agv_id)?;
        let status = transient(agv, FleetOp::Unload)?;

        let carried = agv.carried(product_id);
        if carried == 0 {
            return Err(WarehouseError::PreconditionFailed(format!(
                "AGV {} does not have product {}",
                agv_id, product_id
            )));
        }

        agv.status = status;
        let unloaded = match quantity {
            Some(q) if q < carried => {
                agv.current_load.insert(product_id.to_string(), carried - q);
                q
            }
            _ => {
                agv.current_load.remove(product_id);
                carried
            }
        };
        agv.drain_battery(HANDLING_BATTERY_COST);
        agv.finish();

        debug!(agv_id = %agv_id, product_id = %product_id, unloaded, "AGV unloaded");
        self.writes += 1;
        Ok(unloaded)
    }

    /// Charge an agent's battery, clamped at 100. Returns the new level.
    pub fn charge(&mut self, agv_id: &str, amount: f64) -> CoreResult<f64> {
        if !(amount >= 0.0) {
            return Err(WarehouseError::InvalidParameters(format!(
                "Invalid charge amount {}",
                amount
            )));
        }
        let agv = self.get_mut(agv_id)?;
        agv.status = transient(agv, FleetOp::Charge)?;
        agv.battery_level = (agv.battery_level + amount).min(MAX_BATTERY);
        agv.finish();
        let level = agv.battery_level;
        self.writes += 1;
        Ok(level)
    }

    /// Explicitly set an agent's status (e.g., take it into maintenance)
    pub fn set_status(&mut self, agv_id: &str, status: AgvStatus) -> CoreResult<()> {
        let agv = self.get_mut(agv_id)?;
        agv.status = status;
        agv.last_updated = Utc::now();
        self.writes += 1;
        Ok(())
    }

    /// Replace the whole registry with recovered agents.
    ///
    /// Agents are checked like `register`; on failure the registry is left
    /// untouched.
    pub fn restore(&mut self, agvs: Vec<Agv>) -> CoreResult<()> {
        for agv in &agvs {
            validate(agv)?;
        }

        self.agvs.clear();
        self.index.clear();
        for agv in agvs {
            match self.index.get(&agv.agv_id) {
                Some(&pos) => self.agvs[pos] = agv,
                None => {
                    self.index.insert(agv.agv_id.clone(), self.agvs.len());
                    self.agvs.push(agv);
                }
            }
        }
        Ok(())
    }

    fn get_mut(&mut self, agv_id: &str) -> CoreResult<&mut Agv> {
        match self.index.get(agv_id) {
            Some(&pos) => Ok(&mut self.agvs[pos]),
            None => Err(WarehouseError::agv_not_found(agv_id)),
        }
    }
}

fn transient(agv: &Agv, op: FleetOp) -> CoreResult<AgvStatus> {
    agv.status.begin(op).ok_or_else(|| {
        WarehouseError::PreconditionFailed(format!(
            "AGV {} is not idle (current status: {})",
            agv.agv_id, agv.status
        ))
    })
}

fn validate(agv: &Agv) -> CoreResult<()> {
    if agv.agv_id.is_empty() {
        return Err(WarehouseError::InvalidParameters(
            "agv_id is required".to_string(),
        ));
    }
    if !(agv.max_capacity >= 0.0) {
        return Err(WarehouseError::InvalidParameters(format!(
            "Invalid max capacity {} for {}",
            agv.max_capacity, agv.agv_id
        )));
    }
    if agv.load_total() as f64 > agv.max_capacity {
        return Err(WarehouseError::InvalidParameters(format!(
            "Load of {} exceeds max capacity {} for {}",
            agv.load_total(),
            agv.max_capacity,
            agv.agv_id
        )));
    }
    Ok(())
}
