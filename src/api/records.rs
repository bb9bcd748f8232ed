use super::{blocking, envelope, ApiError, AppState};
use crate::coordinator::NewProduct;
use crate::fleet::Agv;
use crate::inventory::InventoryItem;
use crate::order::OrderItem;
use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AgvRequest {
    pub agv_id: String,
    pub name: String,
    #[serde(default = "default_agv_location")]
    pub location: String,
    #[serde(default = "default_battery_level")]
    pub battery_level: f64,
    #[serde(default = "default_agv_capacity")]
    pub max_capacity: f64,
}

fn default_agv_location() -> String {
    "charging_station".to_string()
}

fn default_battery_level() -> f64 {
    100.0
}

fn default_agv_capacity() -> f64 {
    50.0
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    1
}

/// GET /inventory
pub(super) async fn list_inventory(State(state): State<Arc<AppState>>) -> Json<Value> {
    let inventory = state.coordinator.inventory();
    envelope(
        true,
        "Inventory retrieved successfully",
        json!({ "inventory": inventory }),
    )
}

/// POST /inventory - Create or replace a product record
pub(super) async fn add_inventory_item(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewProduct>,
) -> Result<Json<Value>, ApiError> {
    let item = InventoryItem::new(
        request.product_id,
        request.name,
        request.quantity,
        request.location,
        request.min_threshold,
        request.max_capacity,
    );
    let coordinator = Arc::clone(&state.coordinator);
    let item = blocking(move || coordinator.register_item(item)).await??;

    Ok(envelope(
        true,
        format!("Added inventory item {}", item.product_id),
        json!({ "item": item }),
    ))
}

/// GET /agvs
pub(super) async fn list_agvs(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agvs = state.coordinator.agvs();
    envelope(true, "AGVs retrieved successfully", json!({ "agvs": agvs }))
}

/// POST /agvs - Register an idle agent
pub(super) async fn add_agv(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AgvRequest>,
) -> Result<Json<Value>, ApiError> {
    let agv = Agv::new(
        request.agv_id,
        request.name,
        request.location,
        request.battery_level,
        request.max_capacity,
    );
    let coordinator = Arc::clone(&state.coordinator);
    let agv = blocking(move || coordinator.register_agv(agv)).await??;

    Ok(envelope(
        true,
        format!("Added AGV {}", agv.agv_id),
        json!({ "agv": agv }),
    ))
}

/// GET /orders
pub(super) async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Value> {
    let orders = state.coordinator.orders();
    envelope(
        true,
        "Orders retrieved successfully",
        json!({ "orders": orders }),
    )
}

/// POST /orders
pub(super) async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let coordinator = Arc::clone(&state.coordinator);
    let order = blocking(move || {
        coordinator.create_order(&request.customer_id, request.items, request.priority)
    })
    .await?;

    Ok(envelope(
        true,
        format!("Created order {}", order.order_id),
        json!({ "order": order }),
    ))
}
