use super::plan::{RestockOutcome, RestockPlan};
use super::policy::SelectionPolicy;
use super::RECEIVING;
use crate::error::{CoreResult, WarehouseError};
use crate::fleet::{AgvStatus, FleetRegistry};
use crate::inventory::{InventoryItem, InventoryLedger, DEFAULT_MAX_CAPACITY, DEFAULT_MIN_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// What `load_agent` does when the agent is not at the item's location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Move the agent to the item first
    Travel,
    /// Fail with `PreconditionFailed`
    Forbid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestockReceipt {
    pub product_id: String,
    pub agv_id: String,
    pub restocked_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadReceipt {
    pub agv_id: String,
    pub product_id: String,
    pub quantity: u32,
    /// Agent location after the load
    pub location: String,
    /// Remaining ledger quantity
    pub remaining: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnloadReceipt {
    pub agv_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub location: String,
    pub new_quantity: u32,
    pub new_inventory_item: bool,
}

/// Scheduling core over one critical section.
///
/// Borrows the inventory ledger and the fleet registry mutably, so every
/// multi-step protocol below runs without interleaving. Ledger-then-agent
/// transfers compensate the ledger when the agent step fails; agent-then-ledger
/// transfers compensate the agent when the ledger commit fails.
pub struct AllocationEngine<'a> {
    inventory: &'a mut InventoryLedger,
    fleet: &'a mut FleetRegistry,
    policy: &'a dyn SelectionPolicy,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(
        inventory: &'a mut InventoryLedger,
        fleet: &'a mut FleetRegistry,
        policy: &'a dyn SelectionPolicy,
    ) -> Self {
        Self {
            inventory,
            fleet,
            policy,
        }
    }

    /// Id of the agent the policy picks among available agents
    pub fn select_agent(&self) -> CoreResult<String> {
        let available = self.fleet.available();
        self.policy
            .select(&available)
            .map(|agv| agv.agv_id.clone())
            .ok_or_else(|| WarehouseError::NoAgentAvailable("No available AGVs".to_string()))
    }

    /// Plan a restock of `product_id` to full capacity. Never mutates.
    pub fn plan_restock(&self, product_id: &str) -> CoreResult<RestockOutcome> {
        let item = self
            .inventory
            .get(product_id)
            .ok_or_else(|| WarehouseError::product_not_found(product_id))?;

        if !item.needs_restock() {
            info!(product_id = %product_id, "Product does not need restocking");
            return Ok(RestockOutcome::NotNeeded);
        }

        let agv_id = self.select_agent().map_err(|e| {
            warn!(product_id = %product_id, "No available AGVs for restocking");
            e.map_message(|_| "No available AGVs for restocking".to_string())
        })?;
        let agv = self
            .fleet
            .get(&agv_id)
            .ok_or_else(|| WarehouseError::agv_not_found(&agv_id))?;

        let plan = RestockPlan::build(item, agv, RECEIVING);
        info!(product_id = %product_id, agv_id = %agv_id, amount = plan.restock_amount, "Created restock plan");
        Ok(RestockOutcome::Planned(plan))
    }

    /// Drive an agent through receiving → load → storage → unload, then commit.
    ///
    /// A failing step aborts without undoing earlier steps; the error names
    /// the steps that completed. If the ledger commit fails, the unloaded
    /// units go back onto the agent.
    pub fn execute_restock(
        &mut self,
        product_id: &str,
        agv_id: &str,
        amount: u32,
    ) -> CoreResult<RestockReceipt> {
        let location = self
            .inventory
            .get(product_id)
            .map(|item| item.location.clone())
            .ok_or_else(|| WarehouseError::product_not_found(product_id))?;
        let agv = self
            .fleet
            .get(agv_id)
            .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
        if agv.status != AgvStatus::Idle {
            return Err(WarehouseError::PreconditionFailed(format!(
                "AGV {} is not idle (current status: {})",
                agv_id, agv.status
            )));
        }
        if amount == 0 {
            return Err(WarehouseError::InvalidParameters(
                "restock_amount must be positive".to_string(),
            ));
        }

        let mut completed: Vec<&'static str> = Vec::with_capacity(3);

        info!(agv_id = %agv_id, "Moving AGV to receiving");
        self.fleet
            .move_to(agv_id, RECEIVING)
            .map_err(|e| aborted(e, &completed))?;
        completed.push("move_agv_to_receiving");

        info!(agv_id = %agv_id, product_id = %product_id, amount, "Loading restock units");
        self.fleet
            .load(agv_id, product_id, amount)
            .map_err(|e| aborted(e, &completed))?;
        completed.push("load_inventory");

        info!(agv_id = %agv_id, location = %location, "Moving AGV to storage");
        self.fleet
            .move_to(agv_id, &location)
            .map_err(|e| aborted(e, &completed))?;
        completed.push("move_agv_to_storage");

        let unloaded = self
            .fleet
            .unload(agv_id, product_id, Some(amount))
            .map_err(|e| aborted(e, &completed))?;

        match self.inventory.add_quantity(product_id, unloaded) {
            Ok(new_quantity) => {
                info!(product_id = %product_id, agv_id = %agv_id, unloaded, new_quantity, "Restock finished");
                Ok(RestockReceipt {
                    product_id: product_id.to_string(),
                    agv_id: agv_id.to_string(),
                    restocked_quantity: unloaded,
                    new_quantity,
                })
            }
            Err(e) => {
                self.reload(agv_id, product_id, unloaded);
                Err(e.map_message(|m| {
                    format!(
                        "Failed to add {} units of {} to inventory: {}",
                        unloaded, product_id, m
                    )
                }))
            }
        }
    }

    /// Plan and execute in one go. `None` when no restock is needed.
    pub fn run_restock(
        &mut self,
        product_id: &str,
    ) -> CoreResult<Option<(RestockPlan, RestockReceipt)>> {
        match self.plan_restock(product_id)? {
            RestockOutcome::NotNeeded => Ok(None),
            RestockOutcome::Planned(plan) => {
                let receipt =
                    self.execute_restock(&plan.product_id, &plan.agv_id, plan.restock_amount)?;
                Ok(Some((plan, receipt)))
            }
        }
    }

    /// Move `quantity` units from the ledger onto an agent.
    ///
    /// The ledger is debited first; if the agent cannot take the units they
    /// are credited back, leaving the ledger exactly as before.
    pub fn load_agent(
        &mut self,
        agv_id: &str,
        product_id: &str,
        quantity: u32,
        relocation: Relocation,
    ) -> CoreResult<LoadReceipt> {
        let agv = self
            .fleet
            .get(agv_id)
            .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
        let item = self
            .inventory
            .get(product_id)
            .ok_or_else(|| WarehouseError::product_not_found(product_id))?;
        if quantity == 0 {
            return Err(WarehouseError::InvalidParameters(
                "Quantity to load must be positive".to_string(),
            ));
        }
        if item.quantity < quantity {
            return Err(WarehouseError::PreconditionFailed(format!(
                "Not enough inventory of {} (requested: {}, available: {})",
                product_id, quantity, item.quantity
            )));
        }

        if agv.location != item.location {
            match relocation {
                Relocation::Travel => {
                    let destination = item.location.clone();
                    self.fleet.move_to(agv_id, &destination)?;
                }
                Relocation::Forbid => {
                    return Err(WarehouseError::PreconditionFailed(format!(
                        "AGV {} is not at the same location as product {}",
                        agv_id, product_id
                    )));
                }
            }
        }

        let remaining = self.inventory.remove_quantity(product_id, quantity)?;
        if let Err(e) = self.fleet.load(agv_id, product_id, quantity) {
            if let Err(credit) = self.inventory.add_quantity(product_id, quantity) {
                error!(product_id = %product_id, quantity, error = %credit, "Failed to re-credit inventory");
            }
            warn!(agv_id = %agv_id, product_id = %product_id, quantity, error = %e, "Load failed, inventory restored");
            return Err(e);
        }

        let location = self
            .fleet
            .get(agv_id)
            .map(|agv| agv.location.clone())
            .unwrap_or_default();
        info!(agv_id = %agv_id, product_id = %product_id, quantity, "Loaded AGV");

        Ok(LoadReceipt {
            agv_id: agv_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            location,
            remaining,
        })
    }

    /// Select an available agent and load it, as one claim
    pub fn dispatch_pick(&mut self, product_id: &str, quantity: u32) -> CoreResult<LoadReceipt> {
        let agv_id = self.select_agent()?;
        self.load_agent(&agv_id, product_id, quantity, Relocation::Travel)
    }

    /// Move units off an agent into the ledger at the agent's location.
    ///
    /// A product with no record gets a default one. If the commit fails the
    /// units go back onto the agent.
    pub fn unload_agent(
        &mut self,
        agv_id: &str,
        product_id: &str,
        quantity: Option<u32>,
    ) -> CoreResult<UnloadReceipt> {
        if self.fleet.get(agv_id).is_none() {
            return Err(WarehouseError::agv_not_found(agv_id));
        }
        self.unload_and_commit(agv_id, product_id, quantity)
    }

    /// Unload into an existing record the agent is colocated with
    pub fn restock_from_agent(
        &mut self,
        agv_id: &str,
        product_id: &str,
        quantity: Option<u32>,
    ) -> CoreResult<UnloadReceipt> {
        let agv = self
            .fleet
            .get(agv_id)
            .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
        let item = self
            .inventory
            .get(product_id)
            .ok_or_else(|| WarehouseError::product_not_found(product_id))?;
        if agv.location != item.location {
            return Err(WarehouseError::PreconditionFailed(format!(
                "AGV {} is not at the same location as product {}",
                agv_id, product_id
            )));
        }
        self.unload_and_commit(agv_id, product_id, quantity)
    }

    fn unload_and_commit(
        &mut self,
        agv_id: &str,
        product_id: &str,
        quantity: Option<u32>,
    ) -> CoreResult<UnloadReceipt> {
        let unloaded = self.fleet.unload(agv_id, product_id, quantity)?;
        let location = self
            .fleet
            .get(agv_id)
            .map(|agv| agv.location.clone())
            .unwrap_or_default();

        let new_inventory_item = !self.inventory.contains(product_id);
        let commit = if new_inventory_item {
            self.inventory
                .register(InventoryItem::new(
                    product_id,
                    format!("Product {}", product_id),
                    unloaded,
                    location.clone(),
                    DEFAULT_MIN_THRESHOLD,
                    DEFAULT_MAX_CAPACITY,
                ))
                .map(|()| unloaded)
        } else {
            self.inventory.add_quantity(product_id, unloaded)
        };

        match commit {
            Ok(new_quantity) => {
                info!(agv_id = %agv_id, product_id = %product_id, unloaded, new_inventory_item, "Unloaded AGV");
                Ok(UnloadReceipt {
                    agv_id: agv_id.to_string(),
                    product_id: product_id.to_string(),
                    quantity: unloaded,
                    location,
                    new_quantity,
                    new_inventory_item,
                })
            }
            Err(e) => {
                self.reload(agv_id, product_id, unloaded);
                Err(e.map_message(|m| {
                    format!(
                        "Failed to add {} units of {} to inventory: {}",
                        unloaded, product_id, m
                    )
                }))
            }
        }
    }

    /// Put units that could not be committed back onto the agent
    fn reload(&mut self, agv_id: &str, product_id: &str, quantity: u32) {
        match self.fleet.load(agv_id, product_id, quantity) {
            Ok(()) => {
                warn!(agv_id = %agv_id, product_id = %product_id, quantity, "Commit failed, units returned to AGV");
            }
            Err(e) => {
                error!(agv_id = %agv_id, product_id = %product_id, quantity, error = %e, "Failed to return units to AGV");
            }
        }
    }
}

fn aborted(err: WarehouseError, completed: &[&str]) -> WarehouseError {
    warn!(error = %err, completed = ?completed, "Restock aborted");
    if completed.is_empty() {
        return err;
    }
    let steps = completed.join(", ");
    err.map_message(|m| format!("{} (completed steps: {})", m, steps))
}
