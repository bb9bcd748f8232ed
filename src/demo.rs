// Demo seed data

use crate::coordinator::Coordinator;
use crate::error::CoreResult;
use crate::fleet::Agv;
use crate::inventory::InventoryItem;
use crate::order::OrderItem;
use tracing::info;

/// Seed five products, three AGVs and two pending orders
pub fn seed(coordinator: &Coordinator) -> CoreResult<()> {
    let products = [
        ("P001", "Smartphone", 50, "storage_a", 10, 100),
        ("P002", "Laptop", 20, "storage_a", 5, 50),
        ("P003", "Tablet", 30, "storage_b", 8, 80),
        ("P004", "Headphones", 100, "storage_b", 20, 200),
        ("P005", "Smartwatch", 15, "storage_c", 5, 50),
    ];
    for (id, name, quantity, location, min_threshold, max_capacity) in products {
        coordinator.register_item(InventoryItem::new(
            id,
            name,
            quantity,
            location,
            min_threshold,
            max_capacity,
        ))?;
    }

    let agvs = [
        ("AGV001", "Picker Bot 1", "charging_station", 100.0, 50.0),
        ("AGV002", "Picker Bot 2", "storage_a", 85.0, 50.0),
        ("AGV003", "Heavy Lifter 1", "receiving", 90.0, 100.0),
    ];
    for (id, name, location, battery, capacity) in agvs {
        coordinator.register_agv(Agv::new(id, name, location, battery, capacity))?;
    }

    coordinator.create_order("C001", vec![line("P001", 2), line("P004", 1)], 2);
    coordinator.create_order(
        "C002",
        vec![line("P002", 1), line("P003", 1), line("P005", 1)],
        1,
    );

    info!(
        products = products.len(),
        agvs = agvs.len(),
        orders = 2,
        "Demo data seeded"
    );
    Ok(())
}

fn line(product_id: &str, quantity: u32) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed() {
        let coordinator = Coordinator::new("Demo");
        seed(&coordinator).unwrap();

        let state = coordinator.state();
        assert_eq!(state.inventory.len(), 5);
        assert_eq!(state.agvs.len(), 3);
        assert_eq!(state.orders.len(), 2);
        assert!(state.inventory.iter().all(|view| !view.needs_restock));
        assert!(state.agvs.iter().all(|view| view.is_available));
        let c002 = state
            .orders
            .iter()
            .find(|order| order.customer_id == "C002")
            .unwrap();
        assert_eq!(c002.total_items(), 3);
    }
}
