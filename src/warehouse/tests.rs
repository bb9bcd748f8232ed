use super::*;
use crate::allocation::FirstAvailable;
use crate::fleet::Agv;
use crate::inventory::InventoryItem;

#[test]
fn test_default_layout() {
    let floor = Floor::new("Main");

    assert_eq!(floor.locations().len(), 8);
    assert!(floor.has_location("receiving"));
    assert!(!floor.has_location("roof"));
    assert_eq!(
        floor.location(CHARGING_STATION).unwrap().kind,
        LocationKind::Charging
    );
    assert_eq!(floor.location("storage_b").unwrap().capacity, 100);
}

#[test]
fn test_location_serializes_type() {
    let location = Location::new("shipping", LocationKind::Dock, 10);
    assert_eq!(
        serde_json::to_value(location).unwrap(),
        serde_json::json!({"name": "shipping", "type": "dock", "capacity": 10})
    );
}

#[test]
fn test_stats_counters() {
    let mut stats = WarehouseStats::default();
    stats.record_movement();
    stats.record_pick(3);
    stats.record_restock(7);
    stats.record_order_processed();

    assert_eq!(stats.agv_movements, 1);
    assert_eq!(stats.items_picked, 3);
    assert_eq!(stats.items_restocked, 7);
    assert_eq!(stats.orders_processed, 1);
}

#[test]
fn test_engine_mutates_floor() {
    let mut floor = Floor::new("Main");
    floor
        .inventory
        .register(InventoryItem::new("P001", "Smartphone", 50, "storage_a", 10, 100))
        .unwrap();
    floor
        .fleet
        .register(Agv::new("AGV001", "Bot", "storage_a", 100.0, 50.0))
        .unwrap();

    floor.engine(&FirstAvailable).dispatch_pick("P001", 5).unwrap();

    assert_eq!(floor.inventory.get("P001").unwrap().quantity, 45);
}

#[test]
fn test_state_view_flags() {
    let mut floor = Floor::new("Main");
    floor
        .inventory
        .register(InventoryItem::new("P001", "Smartphone", 5, "storage_a", 10, 100))
        .unwrap();
    floor
        .fleet
        .register(Agv::new("AGV001", "Bot", "storage_a", 10.0, 50.0))
        .unwrap();

    let state = WarehouseState::capture(&floor, vec![]);
    assert!(state.inventory[0].needs_restock);
    assert!(!state.agvs[0].is_available);

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["inventory"][0]["product_id"], "P001");
    assert_eq!(json["inventory"][0]["needs_restock"], true);
    assert_eq!(json["agvs"][0]["status"], "idle");
}
