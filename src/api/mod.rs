// HTTP surface over the coordinator

mod agent;
mod records;
mod reports;

use crate::assistant::Assistant;
use crate::coordinator::Coordinator;
use crate::error::{ErrorKind, WarehouseError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// None disables `/ask-agent`
    pub assistant: Option<Arc<dyn Assistant>>,
}

/// Create the API router with permissive CORS
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(agent::root))
        .route("/ask-agent", post(agent::ask_agent))
        .route("/execute-action", post(agent::execute_action))
        .route("/execute-plan", post(agent::execute_plan))
        .route("/warehouse-state", get(reports::warehouse_state))
        .route("/logs", get(reports::logs))
        .route("/analyze", get(reports::analyze))
        .route(
            "/inventory",
            get(records::list_inventory).post(records::add_inventory_item),
        )
        .route("/agvs", get(records::list_agvs).post(records::add_agv))
        .route("/orders", get(records::list_orders).post(records::create_order))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Response body: `fields` plus `success`, `message` and `timestamp`
fn envelope(success: bool, message: impl Into<String>, fields: Value) -> Json<Value> {
    let mut body = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    body.insert("success".to_string(), json!(success));
    body.insert("message".to_string(), json!(message.into()));
    body.insert("timestamp".to_string(), json!(Utc::now()));
    Json(Value::Object(body))
}

/// Run synchronous coordinator work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))
}

/// API error types
#[derive(Debug)]
enum ApiError {
    Warehouse(WarehouseError),
    Unavailable(String),
    Internal(String),
}

impl From<WarehouseError> for ApiError {
    fn from(e: WarehouseError) -> Self {
        ApiError::Warehouse(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match self {
            ApiError::Warehouse(e) => {
                let status = match e.kind() {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidParameters | ErrorKind::UnknownAction => {
                        StatusCode::BAD_REQUEST
                    }
                    ErrorKind::PreconditionFailed | ErrorKind::NoAgentAvailable => {
                        StatusCode::CONFLICT
                    }
                };
                (status, e.to_string(), json!({ "error": e.kind() }))
            }
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, Value::Null),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, Value::Null),
        };

        (status, envelope(false, message, fields)).into_response()
    }
}
