use crate::error::{CoreResult, ErrorKind, WarehouseError};
use crate::fleet::AgvStatus;
use crate::inventory::{DEFAULT_MAX_CAPACITY, DEFAULT_MIN_THRESHOLD};
use crate::order::{OrderItem, OrderStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed action request.
///
/// Payloads arrive as `{type, agent, action, ...params}`; `agent` picks the
/// family and `action` the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Inventory(InventoryAction),
    Fleet(FleetAction),
    Restock(RestockAction),
    Warehouse(WarehouseAction),
    Order(OrderAction),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryAction {
    CheckInventory {
        product_id: String,
    },
    UpdateInventory {
        product_id: String,
        quantity: i64,
    },
    AddInventory {
        product_id: String,
        quantity: u32,
    },
    RemoveInventory {
        product_id: String,
        quantity: u32,
    },
    AddNewProduct {
        product_data: NewProduct,
    },
    GetInventoryStatus,
    GetRestockRecommendations,
}

const INVENTORY_ACTIONS: &[&str] = &[
    "check_inventory",
    "update_inventory",
    "add_inventory",
    "remove_inventory",
    "add_new_product",
    "get_inventory_status",
    "get_restock_recommendations",
];

/// Fields of `add_new_product`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProduct {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default = "default_product_location")]
    pub location: String,
    #[serde(default = "default_min_threshold")]
    pub min_threshold: u32,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u32,
}

fn default_product_location() -> String {
    "storage_a".to_string()
}

fn default_min_threshold() -> u32 {
    DEFAULT_MIN_THRESHOLD
}

fn default_max_capacity() -> u32 {
    DEFAULT_MAX_CAPACITY
}

fn default_quantity() -> u32 {
    1
}

fn default_charge() -> f64 {
    100.0
}

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FleetAction {
    MoveAgv {
        agv_id: String,
        destination: String,
    },
    ChargeAgv {
        agv_id: String,
        #[serde(default = "default_charge")]
        amount: f64,
    },
    LoadAgv {
        agv_id: String,
        product_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    UnloadAgv {
        agv_id: String,
        product_id: String,
        #[serde(default)]
        quantity: Option<u32>,
    },
    GetAvailableAgvs,
    GetAgvStatus,
    SetAgvStatus {
        agv_id: String,
        status: AgvStatus,
    },
    DispatchPick {
        product_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
}

const FLEET_ACTIONS: &[&str] = &[
    "move_agv",
    "charge_agv",
    "load_agv",
    "unload_agv",
    "get_available_agvs",
    "get_agv_status",
    "set_agv_status",
    "dispatch_pick",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RestockAction {
    GetRestockNeeds,
    PlanRestock {
        product_id: String,
    },
    ExecuteRestock {
        product_id: String,
        agv_id: String,
        restock_amount: u32,
    },
    AutoRestock {
        product_id: String,
    },
}

const RESTOCK_ACTIONS: &[&str] = &[
    "get_restock_needs",
    "plan_restock",
    "execute_restock",
    "auto_restock",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WarehouseAction {
    MoveAgv {
        agv_id: String,
        location: String,
    },
    PickItem {
        agv_id: String,
        product_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    RestockItem {
        agv_id: String,
        product_id: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    ProcessOrder {
        order_id: String,
        status: OrderStatus,
    },
    ChargeAgv {
        agv_id: String,
        #[serde(default = "default_charge")]
        amount: f64,
    },
}

const WAREHOUSE_ACTIONS: &[&str] = &[
    "move_agv",
    "pick_item",
    "restock_item",
    "process_order",
    "charge_agv",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderAction {
    CreateOrder {
        customer_id: String,
        #[serde(default)]
        items: Vec<OrderItem>,
        #[serde(default = "default_priority")]
        priority: i32,
    },
    GetOrder {
        order_id: String,
    },
    AddOrderItem {
        order_id: String,
        product_id: String,
        quantity: u32,
    },
    RemoveOrderItem {
        order_id: String,
        product_id: String,
    },
    CancelOrder {
        order_id: String,
    },
    CompleteOrder {
        order_id: String,
    },
}

const ORDER_ACTIONS: &[&str] = &[
    "create_order",
    "get_order",
    "add_order_item",
    "remove_order_item",
    "cancel_order",
    "complete_order",
];

impl Action {
    /// Parse an untrusted payload.
    ///
    /// Unknown agent kinds and action names yield `UnknownAction`; a missing
    /// `type` or missing/malformed parameters yield `InvalidParameters`.
    /// Warehouse actions are keyed by `action`, falling back to `type`.
    pub fn parse(payload: &Value) -> CoreResult<Action> {
        let obj = payload.as_object().ok_or_else(|| {
            WarehouseError::InvalidParameters("Action must be a JSON object".to_string())
        })?;

        let action_type = obj
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                WarehouseError::InvalidParameters("No action type specified".to_string())
            })?;
        let agent = obj.get("agent").and_then(Value::as_str).unwrap_or_default();
        let name = obj.get("action").and_then(Value::as_str);

        match agent {
            "inventory" => parse_variant(obj, agent, name, INVENTORY_ACTIONS).map(Action::Inventory),
            "agv" => parse_variant(obj, agent, name, FLEET_ACTIONS).map(Action::Fleet),
            "restock" => parse_variant(obj, agent, name, RESTOCK_ACTIONS).map(Action::Restock),
            "warehouse" => parse_variant(obj, agent, name.or(Some(action_type)), WAREHOUSE_ACTIONS)
                .map(Action::Warehouse),
            "order" => parse_variant(obj, agent, name, ORDER_ACTIONS).map(Action::Order),
            other => Err(WarehouseError::UnknownAction(format!(
                "Unknown agent type: {}",
                other
            ))),
        }
    }

    /// False for queries and plans, which never change state
    pub fn mutates(&self) -> bool {
        match self {
            Action::Inventory(action) => !matches!(
                action,
                InventoryAction::CheckInventory { .. }
                    | InventoryAction::GetInventoryStatus
                    | InventoryAction::GetRestockRecommendations
            ),
            Action::Fleet(action) => {
                !matches!(action, FleetAction::GetAvailableAgvs | FleetAction::GetAgvStatus)
            }
            Action::Restock(action) => !matches!(
                action,
                RestockAction::GetRestockNeeds | RestockAction::PlanRestock { .. }
            ),
            Action::Warehouse(_) => true,
            Action::Order(action) => !matches!(action, OrderAction::GetOrder { .. }),
        }
    }
}

fn parse_variant<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    agent: &str,
    name: Option<&str>,
    known: &[&str],
) -> CoreResult<T> {
    let name = name.ok_or_else(|| {
        WarehouseError::InvalidParameters(format!("No action specified for {} agent", agent))
    })?;
    if !known.contains(&name) {
        return Err(WarehouseError::UnknownAction(format!(
            "Unknown {} action type: {}",
            agent, name
        )));
    }

    let mut normalized = obj.clone();
    normalized.insert("action".to_string(), Value::String(name.to_string()));
    serde_json::from_value(Value::Object(normalized)).map_err(|e| {
        WarehouseError::InvalidParameters(format!("Invalid parameters for {}: {}", name, e))
    })
}

/// Outcome of one action, as reported to callers and the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Operation-specific fields, flattened into the result object
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ActionResult {
    /// Success with `fields`; a non-object value is placed under `data`
    pub fn ok(message: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };

        Self {
            success: true,
            message: message.into(),
            error: None,
            fields,
        }
    }

    pub fn failed(err: &WarehouseError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            error: Some(err.kind()),
            fields: Map::new(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl From<CoreResult<ActionResult>> for ActionResult {
    fn from(result: CoreResult<ActionResult>) -> Self {
        result.unwrap_or_else(|e| ActionResult::failed(&e))
    }
}
