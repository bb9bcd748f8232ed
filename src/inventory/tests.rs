use super::*;
use proptest::prelude::*;

fn ledger_with(quantity: u32, min_threshold: u32, max_capacity: u32) -> InventoryLedger {
    let mut ledger = InventoryLedger::new();
    ledger
        .register(InventoryItem::new(
            "P001",
            "Smartphone",
            quantity,
            "storage_a",
            min_threshold,
            max_capacity,
        ))
        .unwrap();
    ledger
}

#[test]
fn test_add_quantity_within_capacity() {
    let mut ledger = ledger_with(50, 10, 100);

    assert_eq!(ledger.add_quantity("P001", 25).unwrap(), 75);
    assert_eq!(ledger.get("P001").unwrap().quantity, 75);
}

#[test]
fn test_add_quantity_over_capacity_leaves_quantity() {
    let mut ledger = ledger_with(90, 10, 100);

    let err = ledger.add_quantity("P001", 11).unwrap_err();
    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert_eq!(ledger.get("P001").unwrap().quantity, 90);

    // Exactly filling is allowed
    assert_eq!(ledger.add_quantity("P001", 10).unwrap(), 100);
}

#[test]
fn test_remove_quantity_insufficient() {
    let mut ledger = ledger_with(5, 10, 100);

    let err = ledger.remove_quantity("P001", 6).unwrap_err();
    assert!(matches!(err, WarehouseError::PreconditionFailed(_)));
    assert_eq!(ledger.get("P001").unwrap().quantity, 5);

    assert_eq!(ledger.remove_quantity("P001", 5).unwrap(), 0);
}

#[test]
fn test_zero_amounts_rejected() {
    let mut ledger = ledger_with(5, 10, 100);

    assert!(matches!(
        ledger.add_quantity("P001", 0),
        Err(WarehouseError::InvalidParameters(_))
    ));
    assert!(matches!(
        ledger.remove_quantity("P001", 0),
        Err(WarehouseError::InvalidParameters(_))
    ));
}

#[test]
fn test_unknown_product() {
    let mut ledger = InventoryLedger::new();

    assert!(ledger.get("P404").is_none());
    assert!(matches!(
        ledger.add_quantity("P404", 1),
        Err(WarehouseError::NotFound(_))
    ));
    assert!(matches!(
        ledger.update_quantity("P404", 1),
        Err(WarehouseError::NotFound(_))
    ));
}

#[test]
fn test_update_quantity_bounds() {
    let mut ledger = ledger_with(5, 10, 100);

    ledger.update_quantity("P001", 100).unwrap();
    assert_eq!(ledger.get("P001").unwrap().quantity, 100);

    assert!(ledger.update_quantity("P001", 101).is_err());
    assert_eq!(ledger.get("P001").unwrap().quantity, 100);

    ledger.update_quantity("P001", 0).unwrap();
    assert_eq!(ledger.get("P001").unwrap().quantity, 0);
}

#[test]
fn test_needs_restock_at_threshold() {
    let item = InventoryItem::new("P001", "Smartphone", 10, "storage_a", 10, 100);
    assert!(item.needs_restock());

    let item = InventoryItem::new("P001", "Smartphone", 11, "storage_a", 10, 100);
    assert!(!item.needs_restock());
}

#[test]
fn test_items_below_threshold_insertion_order() {
    let mut ledger = InventoryLedger::new();
    ledger
        .register(InventoryItem::new("P003", "Tablet", 1, "storage_b", 8, 80))
        .unwrap();
    ledger
        .register(InventoryItem::new("P001", "Smartphone", 50, "storage_a", 10, 100))
        .unwrap();
    ledger
        .register(InventoryItem::new("P002", "Laptop", 2, "storage_a", 5, 50))
        .unwrap();

    let ids: Vec<&str> = ledger
        .items_below_threshold()
        .iter()
        .map(|item| item.product_id.as_str())
        .collect();
    assert_eq!(ids, vec!["P003", "P002"]);
}

#[test]
fn test_register_replaces_in_place() {
    let mut ledger = InventoryLedger::new();
    ledger
        .register(InventoryItem::new("P001", "Smartphone", 50, "storage_a", 10, 100))
        .unwrap();
    ledger
        .register(InventoryItem::new("P002", "Laptop", 20, "storage_a", 5, 50))
        .unwrap();
    ledger
        .register(InventoryItem::new("P001", "Phone v2", 5, "storage_c", 10, 100))
        .unwrap();

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.items()[0].name, "Phone v2");
    assert_eq!(ledger.items()[0].location, "storage_c");
}

#[test]
fn test_register_rejects_over_capacity() {
    let mut ledger = InventoryLedger::new();
    let err = ledger
        .register(InventoryItem::new("P001", "Smartphone", 101, "storage_a", 10, 100))
        .unwrap_err();
    assert!(matches!(err, WarehouseError::InvalidParameters(_)));
    assert!(ledger.is_empty());
}

#[test]
fn test_restore_keeps_timestamps_and_counts_no_writes() {
    let source = ledger_with(50, 10, 100);
    let items = source.items().to_vec();

    let mut ledger = InventoryLedger::new();
    ledger.restore(items.clone()).unwrap();

    assert_eq!(ledger.items(), items.as_slice());
    assert_eq!(ledger.writes(), 0);
}

#[test]
fn test_restore_rejects_over_capacity() {
    let mut ledger = ledger_with(50, 10, 100);
    let mut broken = InventoryItem::new("P002", "Laptop", 20, "storage_a", 5, 50);
    broken.quantity = 51;

    let err = ledger
        .restore(vec![InventoryItem::new("P003", "Tablet", 1, "storage_b", 1, 10), broken])
        .unwrap_err();

    assert!(matches!(err, WarehouseError::InvalidParameters(_)));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("P001").unwrap().quantity, 50);
}

#[test]
fn test_writes_count_committed_changes() {
    let mut ledger = ledger_with(50, 10, 100);
    assert_eq!(ledger.writes(), 1);

    ledger.add_quantity("P001", 5).unwrap();
    assert!(ledger.remove_quantity("P001", 500).is_err());
    assert!(ledger.update_quantity("P001", 101).is_err());
    ledger.update_quantity("P001", 10).unwrap();

    assert_eq!(ledger.writes(), 3);
}

#[derive(Debug, Clone)]
enum LedgerOp {
    Add(u32),
    Remove(u32),
}

fn ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (0u32..150).prop_map(LedgerOp::Add),
        (0u32..150).prop_map(LedgerOp::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_quantity_stays_within_bounds(
        start in 0u32..=100,
        ops in proptest::collection::vec(ledger_op(), 0..50),
    ) {
        let mut ledger = ledger_with(start, 10, 100);

        for op in ops {
            let before = ledger.get("P001").unwrap().quantity;
            let result = match op {
                LedgerOp::Add(n) => ledger.add_quantity("P001", n),
                LedgerOp::Remove(n) => ledger.remove_quantity("P001", n),
            };
            let after = ledger.get("P001").unwrap().quantity;

            prop_assert!(after <= 100);
            match result {
                Ok(q) => prop_assert_eq!(q, after),
                Err(_) => prop_assert_eq!(before, after),
            }
        }
    }
}
