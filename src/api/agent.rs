use super::{blocking, envelope, ApiError, AppState};
use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Send the current warehouse state along with the query
    #[serde(default = "default_include_state")]
    pub include_state: bool,
}

fn default_include_state() -> bool {
    true
}

/// Action envelope; `params` are merged into the payload
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type", default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ActionRequest {
    fn into_payload(self) -> Value {
        let mut payload = self.params;
        let envelope_fields = [
            ("type", self.action_type),
            ("agent", self.agent),
            ("action", self.action),
        ];
        for (key, value) in envelope_fields {
            if let Some(value) = value {
                payload.insert(key.to_string(), Value::String(value));
            }
        }
        Value::Object(payload)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub actions: Vec<ActionRequest>,
}

/// GET /
pub(super) async fn root() -> Json<Value> {
    envelope(true, "Welcome to the depot warehouse coordinator", Value::Null)
}

/// POST /ask-agent - Ask the assistant; suggested actions run in the background
pub(super) async fn ask_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let assistant = state
        .assistant
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Assistant is not configured".to_string()))?;

    let context = request.include_state.then(|| state.coordinator.state());
    let reply = assistant
        .ask(&request.query, context.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Assistant query failed");
            ApiError::Internal(format!("Assistant query failed: {:#}", e))
        })?;

    if !reply.actions.is_empty() {
        let coordinator = Arc::clone(&state.coordinator);
        let actions = reply.actions.clone();
        info!(count = actions.len(), "Executing suggested actions in background");
        tokio::task::spawn_blocking(move || {
            for action in &actions {
                coordinator.execute_action(action);
            }
        });
    }

    Ok(envelope(
        true,
        "Query processed successfully",
        json!({
            "query": request.query,
            "response": reply.response,
            "actions": reply.actions,
            "model": reply.model,
        }),
    ))
}

/// POST /execute-action
pub(super) async fn execute_action(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<Value>, ApiError> {
    let payload = request.into_payload();
    let coordinator = Arc::clone(&state.coordinator);
    let submitted = payload.clone();
    let result = blocking(move || coordinator.execute_action(&submitted)).await?;

    Ok(envelope(
        result.success,
        result.message.clone(),
        json!({ "action": payload, "result": result }),
    ))
}

/// POST /execute-plan - Stops at the first failed action
pub(super) async fn execute_plan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<Value>, ApiError> {
    let payloads: Vec<Value> = request
        .actions
        .into_iter()
        .map(ActionRequest::into_payload)
        .collect();
    let coordinator = Arc::clone(&state.coordinator);
    let plan = payloads.clone();
    let results = blocking(move || coordinator.execute_plan(&plan)).await?;

    let all_successful = results.iter().all(|result| result.success);
    let message = if all_successful {
        "Plan executed successfully"
    } else {
        "Plan execution had errors"
    };

    Ok(envelope(
        all_successful,
        message,
        json!({ "actions": payloads, "results": results }),
    ))
}
