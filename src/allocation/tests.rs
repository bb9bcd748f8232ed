use super::*;
use crate::error::WarehouseError;
use crate::fleet::{Agv, AgvStatus, FleetRegistry};
use crate::inventory::{InventoryItem, InventoryLedger};
use proptest::prelude::*;

struct Floor {
    inventory: InventoryLedger,
    fleet: FleetRegistry,
}

impl Floor {
    fn new() -> Self {
        Self {
            inventory: InventoryLedger::new(),
            fleet: FleetRegistry::new(),
        }
    }

    fn item(mut self, id: &str, quantity: u32, min: u32, max: u32, location: &str) -> Self {
        self.inventory
            .register(InventoryItem::new(id, id, quantity, location, min, max))
            .unwrap();
        self
    }

    fn agv(mut self, id: &str, location: &str, battery: f64, capacity: f64) -> Self {
        self.fleet
            .register(Agv::new(id, id, location, battery, capacity))
            .unwrap();
        self
    }

    fn engine(&mut self) -> AllocationEngine<'_> {
        AllocationEngine::new(&mut self.inventory, &mut self.fleet, &FirstAvailable)
    }
}

#[test]
fn test_priority_values() {
    let quantities = [0, 3, 9];
    let priorities: Vec<u8> = quantities
        .iter()
        .map(|&q| restock_priority(&InventoryItem::new("P", "P", q, "storage_a", 10, 100)))
        .collect();
    assert_eq!(priorities, vec![10, 7, 1]);
}

#[test]
fn test_priority_zero_threshold() {
    let item = InventoryItem::new("P", "P", 0, "storage_a", 0, 100);
    assert_eq!(restock_priority(&item), 10);
    // Not below threshold, but the score is still defined
    let item = InventoryItem::new("P", "P", 4, "storage_a", 0, 100);
    assert_eq!(restock_priority(&item), 1);
}

#[test]
fn test_restock_needs_stable_descending() {
    let floor = Floor::new()
        .item("P009", 9, 10, 100, "storage_a")
        .item("P000", 0, 10, 100, "storage_a")
        .item("P00A", 9, 10, 100, "storage_b")
        .item("P003", 3, 10, 100, "storage_c")
        .item("P050", 50, 10, 100, "storage_c");

    let needs = restock_needs(&floor.inventory);
    let ids: Vec<&str> = needs.iter().map(|n| n.product_id.as_str()).collect();
    assert_eq!(ids, vec!["P000", "P003", "P009", "P00A"]);
    assert_eq!(needs[1].restock_amount, 97);
    assert_eq!(needs[1].priority, 7);
}

#[test]
fn test_plan_restock_not_needed_issues_no_mutation() {
    let mut floor = Floor::new()
        .item("P001", 50, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 100.0);
    let inventory_before = floor.inventory.items().to_vec();
    let fleet_before = floor.fleet.agvs().to_vec();

    let outcome = floor.engine().plan_restock("P001").unwrap();

    assert_eq!(outcome, RestockOutcome::NotNeeded);
    assert_eq!(floor.inventory.items(), inventory_before.as_slice());
    assert_eq!(floor.fleet.agvs(), fleet_before.as_slice());
}

#[test]
fn test_plan_restock_steps() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 100.0);

    let plan = match floor.engine().plan_restock("P001").unwrap() {
        RestockOutcome::Planned(plan) => plan,
        RestockOutcome::NotNeeded => panic!("expected a plan"),
    };

    assert_eq!(plan.restock_amount, 95);
    assert_eq!(plan.agv_id, "AGV001");
    assert_eq!(plan.agv_location, "charging_station");
    let names: Vec<&str> = plan.steps.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "move_agv_to_receiving",
            "load_inventory",
            "move_agv_to_storage",
            "unload_inventory"
        ]
    );
    assert_eq!(
        plan.steps[2],
        PlanStep::MoveAgvToStorage {
            agv_id: "AGV001".to_string(),
            destination: "storage_a".to_string()
        }
    );
    // Planning only describes
    assert_eq!(floor.fleet.get("AGV001").unwrap().location, "charging_station");
}

#[test]
fn test_plan_restock_failures() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 15.0, 100.0);

    assert!(matches!(
        floor.engine().plan_restock("P404"),
        Err(WarehouseError::NotFound(_))
    ));
    assert!(matches!(
        floor.engine().plan_restock("P001"),
        Err(WarehouseError::NoAgentAvailable(_))
    ));
}

#[test]
fn test_plan_step_serializes_with_tag() {
    let step = PlanStep::LoadInventory {
        agv_id: "AGV001".to_string(),
        product_id: "P001".to_string(),
        quantity: 95,
    };
    assert_eq!(
        serde_json::to_value(&step).unwrap(),
        serde_json::json!({
            "step": "load_inventory",
            "agv_id": "AGV001",
            "product_id": "P001",
            "quantity": 95
        })
    );
}

#[test]
fn test_full_restock_cycle() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 100.0);

    let receipt = floor.engine().execute_restock("P001", "AGV001", 95).unwrap();

    assert_eq!(receipt.restocked_quantity, 95);
    assert_eq!(receipt.new_quantity, 100);
    let item = floor.inventory.get("P001").unwrap();
    assert_eq!(item.quantity, 100);
    assert!(!item.needs_restock());

    let agv = floor.fleet.get("AGV001").unwrap();
    assert_eq!(agv.location, "storage_a");
    assert!(agv.current_load.is_empty());
    assert_eq!(agv.status, AgvStatus::Idle);
    // Two moves and two handling steps
    assert_eq!(agv.battery_level, 86.0);
}

#[test]
fn test_execute_restock_preconditions() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 100.0);

    assert!(matches!(
        floor.engine().execute_restock("P404", "AGV001", 10),
        Err(WarehouseError::NotFound(_))
    ));
    assert!(matches!(
        floor.engine().execute_restock("P001", "AGV404", 10),
        Err(WarehouseError::NotFound(_))
    ));
    assert!(matches!(
        floor.engine().execute_restock("P001", "AGV001", 0),
        Err(WarehouseError::InvalidParameters(_))
    ));

    floor
        .fleet
        .set_status("AGV001", AgvStatus::Maintenance)
        .unwrap();
    let err = floor
        .engine()
        .execute_restock("P001", "AGV001", 10)
        .unwrap_err();
    assert!(err.to_string().contains("not idle"));
    assert_eq!(floor.fleet.get("AGV001").unwrap().location, "charging_station");
}

#[test]
fn test_execute_restock_partial_failure_reports_steps() {
    // Agent too small for the load: the move to receiving stays done
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 50.0);

    let err = floor
        .engine()
        .execute_restock("P001", "AGV001", 95)
        .unwrap_err();

    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert!(err.to_string().contains("move_agv_to_receiving"));
    assert_eq!(floor.fleet.get("AGV001").unwrap().location, RECEIVING);
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 5);
}

#[test]
fn test_execute_restock_commit_failure_reloads_agent() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 200.0);

    let err = floor
        .engine()
        .execute_restock("P001", "AGV001", 120)
        .unwrap_err();

    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert!(err.to_string().starts_with("Failed to add 120 units of P001"));
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 5);
    let agv = floor.fleet.get("AGV001").unwrap();
    assert_eq!(agv.carried("P001"), 120);
    assert_eq!(agv.location, "storage_a");
}

#[test]
fn test_run_restock() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .item("P002", 40, 10, 100, "storage_b")
        .agv("AGV001", "charging_station", 100.0, 100.0);

    let (plan, receipt) = floor.engine().run_restock("P001").unwrap().unwrap();
    assert_eq!(plan.restock_amount, 95);
    assert_eq!(receipt.new_quantity, 100);

    assert!(floor.engine().run_restock("P002").unwrap().is_none());
}

#[test]
fn test_load_agent_travels_to_item() {
    let mut floor = Floor::new()
        .item("P001", 50, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 50.0);

    let receipt = floor
        .engine()
        .load_agent("AGV001", "P001", 10, Relocation::Travel)
        .unwrap();

    assert_eq!(receipt.location, "storage_a");
    assert_eq!(receipt.remaining, 40);
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 40);
    assert_eq!(floor.fleet.get("AGV001").unwrap().carried("P001"), 10);
}

#[test]
fn test_load_agent_forbid_requires_colocation() {
    let mut floor = Floor::new()
        .item("P001", 50, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 100.0, 50.0);

    let err = floor
        .engine()
        .load_agent("AGV001", "P001", 10, Relocation::Forbid)
        .unwrap_err();

    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 50);
    assert_eq!(floor.fleet.get("AGV001").unwrap().location, "charging_station");
}

#[test]
fn test_load_agent_insufficient_inventory() {
    let mut floor = Floor::new()
        .item("P001", 5, 10, 100, "storage_a")
        .agv("AGV001", "storage_a", 100.0, 50.0);

    let err = floor
        .engine()
        .load_agent("AGV001", "P001", 6, Relocation::Travel)
        .unwrap_err();
    assert!(err.to_string().contains("Not enough inventory"));
    assert_eq!(floor.fleet.get("AGV001").unwrap().battery_level, 100.0);
}

#[test]
fn test_load_agent_compensates_ledger() {
    let mut floor = Floor::new()
        .item("P001", 80, 10, 100, "storage_a")
        .agv("AGV001", "storage_a", 100.0, 50.0);

    // Ledger can cover it, the agent cannot carry it
    let err = floor
        .engine()
        .load_agent("AGV001", "P001", 60, Relocation::Travel)
        .unwrap_err();

    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 80);
    assert!(floor.fleet.get("AGV001").unwrap().current_load.is_empty());
}

#[test]
fn test_dispatch_pick_claims_agent() {
    let mut floor = Floor::new()
        .item("P001", 50, 10, 100, "storage_a")
        .agv("AGV001", "charging_station", 15.0, 50.0)
        .agv("AGV002", "receiving", 90.0, 50.0);

    let receipt = floor.engine().dispatch_pick("P001", 2).unwrap();
    assert_eq!(receipt.agv_id, "AGV002");

    // The loaded agent is no longer eligible
    assert!(matches!(
        floor.engine().dispatch_pick("P001", 2),
        Err(WarehouseError::NoAgentAvailable(_))
    ));
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 48);
}

#[test]
fn test_unload_agent_creates_record() {
    let mut floor = Floor::new().agv("AGV001", "storage_c", 100.0, 50.0);
    floor.fleet.load("AGV001", "P777", 12).unwrap();

    let receipt = floor.engine().unload_agent("AGV001", "P777", None).unwrap();

    assert!(receipt.new_inventory_item);
    assert_eq!(receipt.quantity, 12);
    let item = floor.inventory.get("P777").unwrap();
    assert_eq!(item.name, "Product P777");
    assert_eq!(item.location, "storage_c");
    assert_eq!(item.min_threshold, 5);
    assert_eq!(item.max_capacity, 100);
}

#[test]
fn test_unload_agent_commit_failure_reloads() {
    let mut floor = Floor::new()
        .item("P001", 95, 10, 100, "storage_a")
        .agv("AGV001", "storage_a", 100.0, 50.0);
    floor.fleet.load("AGV001", "P001", 10).unwrap();

    let err = floor
        .engine()
        .unload_agent("AGV001", "P001", Some(10))
        .unwrap_err();

    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 95);
    assert_eq!(floor.fleet.get("AGV001").unwrap().carried("P001"), 10);
}

#[test]
fn test_unload_agent_new_record_over_capacity_reloads() {
    let mut floor = Floor::new().agv("AGV001", "storage_c", 100.0, 200.0);
    floor.fleet.load("AGV001", "P777", 150).unwrap();

    assert!(floor.engine().unload_agent("AGV001", "P777", None).is_err());
    assert!(floor.inventory.get("P777").is_none());
    assert_eq!(floor.fleet.get("AGV001").unwrap().carried("P777"), 150);
}

#[test]
fn test_restock_from_agent_requires_colocation() {
    let mut floor = Floor::new()
        .item("P001", 20, 10, 100, "storage_a")
        .agv("AGV001", "receiving", 100.0, 50.0);
    floor.fleet.load("AGV001", "P001", 10).unwrap();

    assert!(matches!(
        floor.engine().restock_from_agent("AGV001", "P001", Some(5)),
        Err(WarehouseError::PreconditionFailed(_))
    ));

    floor.fleet.move_to("AGV001", "storage_a").unwrap();
    let receipt = floor
        .engine()
        .restock_from_agent("AGV001", "P001", Some(5))
        .unwrap();
    assert_eq!(receipt.new_quantity, 25);
    assert_eq!(floor.fleet.get("AGV001").unwrap().carried("P001"), 5);
}

#[test]
fn test_plan_route_is_direct() {
    let agv = Agv::new("AGV001", "Bot", "receiving", 100.0, 50.0);
    assert_eq!(plan_route(&agv, "storage_b"), vec!["receiving", "storage_b"]);
}

proptest! {
    #[test]
    fn prop_failed_load_restores_ledger(
        stock in 0u32..=100,
        capacity in 1u32..100,
        preload in 0u32..50,
        request in 1u32..150,
    ) {
        let mut floor = Floor::new()
            .item("P001", stock, 10, 100, "storage_a")
            .agv("AGV001", "storage_a", 100.0, f64::from(capacity));
        if preload > 0 && preload <= capacity {
            floor.fleet.load("AGV001", "P002", preload).unwrap();
        }
        let load_before = floor.fleet.get("AGV001").unwrap().load_total();

        let result = floor.engine().load_agent("AGV001", "P001", request, Relocation::Forbid);
        let after = floor.inventory.get("P001").unwrap().quantity;
        let agv = floor.fleet.get("AGV001").unwrap();

        match result {
            Ok(receipt) => {
                prop_assert_eq!(after, stock - request);
                prop_assert_eq!(receipt.remaining, after);
                prop_assert_eq!(agv.load_total(), load_before + u64::from(request));
            }
            Err(_) => {
                prop_assert_eq!(after, stock);
                prop_assert_eq!(agv.load_total(), load_before);
            }
        }
    }
}
