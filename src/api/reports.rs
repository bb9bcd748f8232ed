use super::{envelope, AppState};
use crate::coordinator::LogQuery;
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /warehouse-state
pub(super) async fn warehouse_state(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = state.coordinator.state();
    envelope(
        true,
        "Warehouse state retrieved successfully",
        json!({ "state": snapshot }),
    )
}

/// GET /logs
///
/// Query parameters:
/// - `limit`: last N entries, 0 for all (default 10)
/// - `action_type`: match the action's `type`
/// - `agent`: match the action's `agent`
pub(super) async fn logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Json<Value> {
    let logs = state.coordinator.logs(&query);
    envelope(
        true,
        format!("Retrieved {} logs", logs.len()),
        json!({ "logs": logs }),
    )
}

/// GET /analyze
pub(super) async fn analyze(State(state): State<Arc<AppState>>) -> Json<Value> {
    let analysis = state.coordinator.analyze();
    envelope(
        true,
        "Warehouse analysis completed",
        json!({ "analysis": analysis }),
    )
}
