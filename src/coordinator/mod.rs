// Coordinator: action dispatch, journal, analysis

pub mod action;
pub mod analysis;
pub mod journal;

pub use action::{
    Action, ActionResult, FleetAction, InventoryAction, NewProduct, OrderAction, RestockAction,
    WarehouseAction,
};
pub use analysis::{Analysis, AnalysisSummary, Recommendation};
pub use journal::{ActionJournal, EntryKind, JournalEntry, LogQuery};

use crate::allocation::{
    plan_route, restock_needs, FirstAvailable, Relocation, RestockOutcome, SelectionPolicy,
};
use crate::error::{CoreResult, WarehouseError};
use crate::fleet::{Agv, AgvStatus};
use crate::inventory::InventoryItem;
use crate::order::{Order, OrderItem, OrderLedger, OrderStatus};
use crate::snapshot::{SnapshotStore, WarehouseSnapshot};
use crate::warehouse::{Floor, WarehouseState, CHARGING_STATION};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};


/// Entry point for every operation on the warehouse.
///
/// The floor (inventory + fleet) sits behind one mutex so each action runs
/// as a single critical section; orders live in their own per-key map.
/// Snapshots are built under the floor lock and written after it is
/// released.
pub struct Coordinator {
    floor: Mutex<Floor>,
    orders: OrderLedger,
    journal: ActionJournal,
    store: Option<Arc<dyn SnapshotStore>>,
    policy: Box<dyn SelectionPolicy>,
    revision: AtomicU64,
    /// Orders snapshot writes by revision
    persist_lock: Mutex<()>,
}

impl Coordinator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            floor: Mutex::new(Floor::new(name)),
            orders: OrderLedger::new(),
            journal: ActionJournal::new(),
            store: None,
            policy: Box::new(FirstAvailable),
            revision: AtomicU64::new(0),
            persist_lock: Mutex::new(()),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_journal(mut self, journal: ActionJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace all state with a recovered snapshot.
    ///
    /// A snapshot that breaks a ledger invariant is rejected and live state
    /// is left as it was.
    pub fn restore(&self, snapshot: WarehouseSnapshot) -> CoreResult<()> {
        let revision = snapshot.revision;
        let records = snapshot.record_count();
        snapshot.apply(&mut self.floor(), &self.orders)?;
        self.revision.store(revision, Ordering::SeqCst);
        info!(revision, records, "Warehouse state restored");
        Ok(())
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Parse, dispatch and journal one action.
    ///
    /// Never panics on bad input; every failure is folded into the result.
    /// A snapshot is written whenever a mutating action changed state, even
    /// if it failed part way through.
    pub fn execute_action(&self, payload: &Value) -> ActionResult {
        self.journal.record_action(payload);

        let (result, mutated) = match Action::parse(payload) {
            Ok(action) => {
                let before = self.writes();
                let result: ActionResult = self.dispatch(&action).into();
                let mutated = action.mutates() && self.writes() != before;
                (result, mutated)
            }
            Err(e) => (ActionResult::failed(&e), false),
        };

        let agent = payload.get("agent").and_then(Value::as_str).unwrap_or_default();
        let action_name = payload.get("action").and_then(Value::as_str).unwrap_or_default();
        if result.success {
            info!(agent = %agent, action = %action_name, "Action succeeded");
        } else {
            warn!(
                agent = %agent,
                action = %action_name,
                message = %result.message,
                "Action failed"
            );
        }

        self.journal.record_result(payload, &result);
        if mutated {
            self.persist();
        }
        result
    }

    /// Run actions in order, stopping after the first failure.
    ///
    /// Earlier successes are not rolled back.
    pub fn execute_plan(&self, payloads: &[Value]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let result = self.execute_action(payload);
            let failed = !result.success;
            results.push(result);
            if failed {
                warn!(step = results.len(), total = payloads.len(), "Plan stopped at failed action");
                break;
            }
        }
        results
    }

    pub fn state(&self) -> WarehouseState {
        let floor = self.floor();
        WarehouseState::capture(&floor, self.orders.active())
    }

    pub fn logs(&self, query: &LogQuery) -> Vec<JournalEntry> {
        self.journal.query(query)
    }

    pub fn analyze(&self) -> Analysis {
        analysis::analyze(&self.state())
    }

    pub fn inventory(&self) -> Vec<InventoryItem> {
        self.floor().inventory.items().to_vec()
    }

    pub fn agvs(&self) -> Vec<Agv> {
        self.floor().fleet.agvs().to_vec()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.orders()
    }

    /// Create or replace a product record
    pub fn register_item(&self, item: InventoryItem) -> CoreResult<InventoryItem> {
        let registered = {
            let mut floor = self.floor();
            floor.inventory.register(item.clone())?;
            floor
                .inventory
                .get(&item.product_id)
                .cloned()
                .ok_or_else(|| WarehouseError::product_not_found(&item.product_id))?
        };
        self.persist();
        Ok(registered)
    }

    /// Create or replace an agent
    pub fn register_agv(&self, agv: Agv) -> CoreResult<Agv> {
        let registered = {
            let mut floor = self.floor();
            floor.fleet.register(agv.clone())?;
            floor
                .fleet
                .get(&agv.agv_id)
                .cloned()
                .ok_or_else(|| WarehouseError::agv_not_found(&agv.agv_id))?
        };
        self.persist();
        Ok(registered)
    }

    pub fn create_order(&self, customer_id: &str, items: Vec<OrderItem>, priority: i32) -> Order {
        let order = self.orders.create(customer_id, items, priority);
        self.persist();
        order
    }

    fn dispatch(&self, action: &Action) -> CoreResult<ActionResult> {
        match action {
            Action::Inventory(action) => self.dispatch_inventory(action),
            Action::Fleet(action) => self.dispatch_fleet(action),
            Action::Restock(action) => self.dispatch_restock(action),
            Action::Warehouse(action) => self.dispatch_warehouse(action),
            Action::Order(action) => self.dispatch_order(action),
        }
    }

    fn dispatch_inventory(&self, action: &InventoryAction) -> CoreResult<ActionResult> {
        let mut floor = self.floor();
        let inventory = &mut floor.inventory;

        match action {
            InventoryAction::CheckInventory { product_id } => {
                let item = inventory
                    .get(product_id)
                    .ok_or_else(|| WarehouseError::product_not_found(product_id))?;
                Ok(ActionResult::ok(
                    format!("Product {} has {} units", product_id, item.quantity),
                    json!({
                        "product_id": product_id,
                        "quantity": item.quantity,
                        "location": item.location,
                        "needs_restock": item.needs_restock(),
                    }),
                ))
            }
            InventoryAction::UpdateInventory {
                product_id,
                quantity,
            } => {
                let quantity = u32::try_from(*quantity).map_err(|_| {
                    WarehouseError::InvalidParameters(format!(
                        "Invalid quantity {} for {}",
                        quantity, product_id
                    ))
                })?;
                inventory.update_quantity(product_id, quantity)?;
                Ok(ActionResult::ok(
                    format!("Updated inventory for {} to {} units", product_id, quantity),
                    json!({ "product_id": product_id, "new_quantity": quantity }),
                ))
            }
            InventoryAction::AddInventory {
                product_id,
                quantity,
            } => {
                let new_quantity = inventory.add_quantity(product_id, *quantity)?;
                Ok(ActionResult::ok(
                    format!("Added {} units to inventory for {}", quantity, product_id),
                    json!({
                        "product_id": product_id,
                        "added_quantity": quantity,
                        "new_quantity": new_quantity,
                    }),
                ))
            }
            InventoryAction::RemoveInventory {
                product_id,
                quantity,
            } => {
                let new_quantity = inventory.remove_quantity(product_id, *quantity)?;
                Ok(ActionResult::ok(
                    format!("Removed {} units from inventory for {}", quantity, product_id),
                    json!({
                        "product_id": product_id,
                        "removed_quantity": quantity,
                        "new_quantity": new_quantity,
                    }),
                ))
            }
            InventoryAction::AddNewProduct { product_data } => {
                let item = InventoryItem::new(
                    product_data.product_id.clone(),
                    product_data.name.clone(),
                    product_data.quantity,
                    product_data.location.clone(),
                    product_data.min_threshold,
                    product_data.max_capacity,
                );
                inventory.register(item)?;
                let product = inventory.get(&product_data.product_id).cloned();
                Ok(ActionResult::ok(
                    format!("Added new product {}", product_data.product_id),
                    json!({ "product": product }),
                ))
            }
            InventoryAction::GetInventoryStatus => {
                let below: Vec<&InventoryItem> = inventory.items_below_threshold();
                Ok(ActionResult::ok(
                    format!("{} products in inventory", inventory.len()),
                    json!({
                        "total_items": inventory.len(),
                        "items": inventory.items(),
                        "items_below_threshold": below,
                        "timestamp": Utc::now(),
                    }),
                ))
            }
            InventoryAction::GetRestockRecommendations => {
                let recommendations: Vec<Value> = inventory
                    .items_below_threshold()
                    .into_iter()
                    .map(|item| {
                        json!({
                            "product_id": item.product_id,
                            "name": item.name,
                            "current_quantity": item.quantity,
                            "min_threshold": item.min_threshold,
                            "max_capacity": item.max_capacity,
                            "recommended_restock": item.headroom(),
                            "location": item.location,
                        })
                    })
                    .collect();
                Ok(ActionResult::ok(
                    format!("{} products need restocking", recommendations.len()),
                    json!({ "recommendations": recommendations }),
                ))
            }
        }
    }

    fn dispatch_fleet(&self, action: &FleetAction) -> CoreResult<ActionResult> {
        let mut floor = self.floor();

        match action {
            FleetAction::MoveAgv {
                agv_id,
                destination,
            } => {
                let agv = floor
                    .fleet
                    .get(agv_id)
                    .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
                if agv.status != AgvStatus::Idle {
                    return Err(WarehouseError::PreconditionFailed(format!(
                        "AGV {} is not idle (current status: {})",
                        agv_id, agv.status
                    )));
                }
                if !floor.has_location(destination) {
                    return Err(WarehouseError::InvalidParameters(format!(
                        "Invalid destination: {}",
                        destination
                    )));
                }

                let route = plan_route(agv, destination);
                floor.fleet.move_to(agv_id, destination)?;
                Ok(ActionResult::ok(
                    format!("Moved AGV {} to {}", agv_id, destination),
                    json!({
                        "agv_id": agv_id,
                        "from_location": route[0],
                        "to_location": destination,
                        "route": route,
                    }),
                ))
            }
            FleetAction::ChargeAgv { agv_id, amount } => {
                let agv = floor
                    .fleet
                    .get(agv_id)
                    .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
                if agv.location != CHARGING_STATION {
                    floor.fleet.move_to(agv_id, CHARGING_STATION)?;
                }
                let level = floor.fleet.charge(agv_id, *amount)?;
                Ok(ActionResult::ok(
                    format!("Charged AGV {} to {}%", agv_id, level),
                    json!({
                        "agv_id": agv_id,
                        "new_battery_level": level,
                        "location": CHARGING_STATION,
                    }),
                ))
            }
            FleetAction::LoadAgv {
                agv_id,
                product_id,
                quantity,
            } => {
                let receipt = floor.engine(self.policy.as_ref()).load_agent(
                    agv_id,
                    product_id,
                    *quantity,
                    Relocation::Travel,
                )?;
                Ok(ActionResult::ok(
                    format!(
                        "Loaded {} units of {} onto AGV {}",
                        quantity, product_id, agv_id
                    ),
                    json!(receipt),
                ))
            }
            FleetAction::UnloadAgv {
                agv_id,
                product_id,
                quantity,
            } => {
                let receipt =
                    floor
                        .engine(self.policy.as_ref())
                        .unload_agent(agv_id, product_id, *quantity)?;
                Ok(ActionResult::ok(
                    format!(
                        "Unloaded {} units of {} from AGV {}",
                        receipt.quantity, product_id, agv_id
                    ),
                    json!(receipt),
                ))
            }
            FleetAction::GetAvailableAgvs => {
                let available: Vec<&Agv> = floor.fleet.available();
                Ok(ActionResult::ok(
                    format!("Found {} available AGVs", available.len()),
                    json!({ "available_agvs": available }),
                ))
            }
            FleetAction::GetAgvStatus => Ok(ActionResult::ok(
                format!("{} AGVs in fleet", floor.fleet.len()),
                json!({
                    "total_agvs": floor.fleet.len(),
                    "available_agvs": floor.fleet.available().len(),
                    "agvs": floor.fleet.agvs(),
                    "timestamp": Utc::now(),
                }),
            )),
            FleetAction::SetAgvStatus { agv_id, status } => {
                floor.fleet.set_status(agv_id, *status)?;
                Ok(ActionResult::ok(
                    format!("AGV {} is now {}", agv_id, status),
                    json!({ "agv_id": agv_id, "status": status }),
                ))
            }
            FleetAction::DispatchPick {
                product_id,
                quantity,
            } => {
                let receipt = floor
                    .engine(self.policy.as_ref())
                    .dispatch_pick(product_id, *quantity)?;
                Ok(ActionResult::ok(
                    format!(
                        "Dispatched AGV {} to pick {} units of {}",
                        receipt.agv_id, quantity, product_id
                    ),
                    json!(receipt),
                ))
            }
        }
    }

    fn dispatch_restock(&self, action: &RestockAction) -> CoreResult<ActionResult> {
        let mut floor = self.floor();

        match action {
            RestockAction::GetRestockNeeds => {
                let needs = restock_needs(&floor.inventory);
                Ok(ActionResult::ok(
                    format!("Found {} items that need restocking", needs.len()),
                    json!({ "restock_needs": needs }),
                ))
            }
            RestockAction::PlanRestock { product_id } => {
                match floor.engine(self.policy.as_ref()).plan_restock(product_id)? {
                    RestockOutcome::NotNeeded => Ok(not_needed(product_id)),
                    RestockOutcome::Planned(plan) => {
                        let mut result = ActionResult::ok(
                            format!("Created restock plan for {}", product_id),
                            json!(plan),
                        );
                        result.fields.insert("restock_needed".to_string(), json!(true));
                        Ok(result)
                    }
                }
            }
            RestockAction::ExecuteRestock {
                product_id,
                agv_id,
                restock_amount,
            } => {
                let receipt = floor.engine(self.policy.as_ref()).execute_restock(
                    product_id,
                    agv_id,
                    *restock_amount,
                )?;
                Ok(ActionResult::ok(
                    format!(
                        "Restocked {} units of {}",
                        receipt.restocked_quantity, product_id
                    ),
                    json!(receipt),
                ))
            }
            RestockAction::AutoRestock { product_id } => {
                match floor.engine(self.policy.as_ref()).run_restock(product_id)? {
                    None => Ok(not_needed(product_id)),
                    Some((plan, receipt)) => {
                        let mut result = ActionResult::ok(
                            format!(
                                "Restocked {} units of {} with AGV {}",
                                receipt.restocked_quantity, product_id, receipt.agv_id
                            ),
                            json!(receipt),
                        );
                        result.fields.insert("restock_needed".to_string(), json!(true));
                        result.fields.insert("plan".to_string(), json!(plan));
                        Ok(result)
                    }
                }
            }
        }
    }

    fn dispatch_warehouse(&self, action: &WarehouseAction) -> CoreResult<ActionResult> {
        let mut floor = self.floor();

        match action {
            WarehouseAction::MoveAgv { agv_id, location } => {
                floor.fleet.move_to(agv_id, location)?;
                floor.stats.record_movement();
                Ok(ActionResult::ok(
                    format!("AGV {} moved to {}", agv_id, location),
                    json!({ "agv_id": agv_id, "location": location }),
                ))
            }
            WarehouseAction::PickItem {
                agv_id,
                product_id,
                quantity,
            } => {
                let receipt = floor.engine(self.policy.as_ref()).load_agent(
                    agv_id,
                    product_id,
                    *quantity,
                    Relocation::Forbid,
                )?;
                floor.stats.record_pick(receipt.quantity);
                Ok(ActionResult::ok(
                    format!(
                        "Picked {} units of {} with AGV {}",
                        quantity, product_id, agv_id
                    ),
                    json!(receipt),
                ))
            }
            WarehouseAction::RestockItem {
                agv_id,
                product_id,
                quantity,
            } => {
                let receipt = floor.engine(self.policy.as_ref()).restock_from_agent(
                    agv_id,
                    product_id,
                    Some(*quantity),
                )?;
                floor.stats.record_restock(receipt.quantity);
                Ok(ActionResult::ok(
                    format!(
                        "Restocked {} units of {} from AGV {}",
                        receipt.quantity, product_id, agv_id
                    ),
                    json!(receipt),
                ))
            }
            WarehouseAction::ProcessOrder { order_id, status } => {
                let order = self.orders.update_status(order_id, *status)?;
                if *status == OrderStatus::Completed {
                    floor.stats.record_order_processed();
                }
                Ok(ActionResult::ok(
                    format!("Updated order {} status to {}", order_id, status),
                    json!({ "order": order }),
                ))
            }
            WarehouseAction::ChargeAgv { agv_id, amount } => {
                let agv = floor
                    .fleet
                    .get(agv_id)
                    .ok_or_else(|| WarehouseError::agv_not_found(agv_id))?;
                if agv.location != CHARGING_STATION {
                    return Err(WarehouseError::PreconditionFailed(format!(
                        "AGV {} is not at a charging station",
                        agv_id
                    )));
                }
                let level = floor.fleet.charge(agv_id, *amount)?;
                Ok(ActionResult::ok(
                    format!("Charged AGV {} to {}%", agv_id, level),
                    json!({ "agv_id": agv_id, "new_battery_level": level }),
                ))
            }
        }
    }

    fn dispatch_order(&self, action: &OrderAction) -> CoreResult<ActionResult> {
        let (message, order) = match action {
            OrderAction::CreateOrder {
                customer_id,
                items,
                priority,
            } => {
                let order = self.orders.create(customer_id, items.clone(), *priority);
                (format!("Created order {}", order.order_id), order)
            }
            OrderAction::GetOrder { order_id } => {
                let order = self
                    .orders
                    .get(order_id)
                    .ok_or_else(|| WarehouseError::order_not_found(order_id))?;
                (format!("Order {} is {}", order_id, order.status), order)
            }
            OrderAction::AddOrderItem {
                order_id,
                product_id,
                quantity,
            } => (
                format!("Added {} units of {} to order {}", quantity, product_id, order_id),
                self.orders.add_item(order_id, product_id, *quantity)?,
            ),
            OrderAction::RemoveOrderItem {
                order_id,
                product_id,
            } => (
                format!("Removed {} from order {}", product_id, order_id),
                self.orders.remove_item(order_id, product_id)?,
            ),
            OrderAction::CancelOrder { order_id } => (
                format!("Cancelled order {}", order_id),
                self.orders.cancel(order_id)?,
            ),
            OrderAction::CompleteOrder { order_id } => (
                format!("Completed order {}", order_id),
                self.orders.complete(order_id)?,
            ),
        };

        Ok(ActionResult::ok(message, json!({ "order": order })))
    }

    /// Write a snapshot if a store is configured. Failures are logged only.
    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };

        let _ordered = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = {
            let floor = self.floor();
            WarehouseSnapshot::capture(&floor, self.orders.orders(), revision)
        };

        if let Err(e) = store.save(&snapshot) {
            error!(revision, error = %e, "Failed to persist snapshot");
        }
    }

    fn writes(&self) -> u64 {
        self.floor().writes() + self.orders.writes()
    }

    fn floor(&self) -> MutexGuard<'_, Floor> {
        self.floor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_needed(product_id: &str) -> ActionResult {
    ActionResult::ok(
        format!("Product {} does not need restocking", product_id),
        json!({ "product_id": product_id, "restock_needed": false }),
    )
}
