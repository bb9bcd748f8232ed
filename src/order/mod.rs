use crate::error::{CoreResult, WarehouseError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;


/// Fulfillment status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Picking,
    Packing,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Picking,
        OrderStatus::Packing,
        OrderStatus::Shipping,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Terminal orders drop out of the active view but are never purged
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Status reached when moving to `next`.
    ///
    /// Every transition is currently permitted, including leaving a
    /// terminal status.
    pub fn transition_to(self, next: OrderStatus) -> OrderStatus {
        next
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Picking => "picking",
            OrderStatus::Packing => "packing",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| WarehouseError::InvalidParameters(format!("Invalid order status: {}", s)))
    }
}

/// One order line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Customer order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// UUIDv7 identifier, generated on creation
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Add a line, merging into an existing line for the same product
    fn add_item(&mut self, product_id: &str, quantity: u32) -> CoreResult<()> {
        match self.items.iter_mut().find(|item| item.product_id == product_id) {
            Some(item) => {
                item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                    WarehouseError::InvalidParameters(format!(
                        "Order line for {} cannot hold {} more units (current: {})",
                        product_id, quantity, item.quantity
                    ))
                })?;
            }
            None => self.items.push(OrderItem {
                product_id: product_id.to_string(),
                quantity,
            }),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn remove_item(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

/// Order ledger keyed by order id.
///
/// Operations are single-order, so per-key locking of the map is enough to
/// keep each one atomic. No validation against inventory happens here.
pub struct OrderLedger {
    orders: Arc<DashMap<String, Order>>,
    writes: AtomicU64,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Count of committed changes since creation
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Create a pending order with a fresh id
    pub fn create(&self, customer_id: &str, items: Vec<OrderItem>, priority: i32) -> Order {
        let now = Utc::now();
        let order = Order {
            order_id: Uuid::now_v7().to_string(),
            customer_id: customer_id.to_string(),
            items,
            status: OrderStatus::Pending,
            priority,
            created_at: now,
            updated_at: now,
        };

        self.orders.insert(order.order_id.clone(), order.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        info!(order_id = %order.order_id, customer_id = %customer_id, "Order created");

        order
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    /// All orders, oldest first
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        orders
    }

    pub fn by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|o| o.status == status)
            .collect()
    }

    /// Orders not yet completed or cancelled
    pub fn active(&self) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|o| !o.status.is_terminal())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn update_status(&self, order_id: &str, status: OrderStatus) -> CoreResult<Order> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| WarehouseError::order_not_found(order_id))?;

        order.status = order.status.transition_to(status);
        order.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(order.clone())
    }

    pub fn add_item(&self, order_id: &str, product_id: &str, quantity: u32) -> CoreResult<Order> {
        if quantity == 0 {
            return Err(WarehouseError::InvalidParameters(
                "Order item quantity must be positive".to_string(),
            ));
        }
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| WarehouseError::order_not_found(order_id))?;

        order.add_item(product_id, quantity)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(order.clone())
    }

    pub fn remove_item(&self, order_id: &str, product_id: &str) -> CoreResult<Order> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| WarehouseError::order_not_found(order_id))?;

        if !order.remove_item(product_id) {
            return Err(WarehouseError::NotFound(format!(
                "Product {} is not on order {}",
                product_id, order_id
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(order.clone())
    }

    pub fn cancel(&self, order_id: &str) -> CoreResult<Order> {
        self.update_status(order_id, OrderStatus::Cancelled)
    }

    pub fn complete(&self, order_id: &str) -> CoreResult<Order> {
        self.update_status(order_id, OrderStatus::Completed)
    }

    /// Replace all orders with recovered ones
    pub fn restore(&self, orders: Vec<Order>) {
        self.orders.clear();
        for order in orders {
            self.orders.insert(order.order_id.clone(), order);
        }
    }
}

impl Default for OrderLedger {
    fn default() -> Self {
        Self::new()
    }
}
