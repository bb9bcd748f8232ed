// Natural-language assistant: trait, prompt, action extraction

mod gemini;

pub use gemini::{AssistantConfig, GeminiAssistant};

use crate::warehouse::WarehouseState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[cfg(test)]
mod tests;

/// Reply from an assistant, with any actions it suggested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response: String,
    /// Raw action payloads, not yet validated
    pub actions: Vec<Value>,
    pub model: String,
}

/// Collaborator that answers operator questions about the warehouse.
///
/// Implementations never touch warehouse state; suggested actions are
/// returned and executed by the caller like any other request.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ask(&self, prompt: &str, context: Option<&WarehouseState>) -> Result<AssistantReply>;
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI assistant managing a smart warehouse system. Your role is to analyze the warehouse state and suggest optimal actions for inventory management, AGV routing, and order processing.

When responding, follow these guidelines:
1. Analyze the current warehouse state provided in JSON format
2. Identify any issues that need attention (low inventory, pending orders, etc.)
3. Suggest specific actions to address these issues
4. Format your action suggestions in a structured way that can be parsed by the system

For action suggestions, use the following JSON format within your response:
```json
{
  "actions": [
    {
      "type": "move_agv",
      "agent": "agv",
      "action": "move_agv",
      "agv_id": "AGV001",
      "destination": "storage_a"
    },
    {
      "type": "restock_item",
      "agent": "inventory",
      "action": "add_inventory",
      "product_id": "P001",
      "quantity": 10
    }
  ]
}
```

Available agents and actions:
- inventory: check_inventory, update_inventory, add_inventory, remove_inventory, add_new_product, get_inventory_status, get_restock_recommendations
- agv: move_agv, charge_agv, load_agv, unload_agv, get_available_agvs, get_agv_status, set_agv_status, dispatch_pick
- restock: get_restock_needs, plan_restock, execute_restock, auto_restock
- warehouse: move_agv, pick_item, restock_item, process_order, charge_agv
- order: create_order, get_order, add_order_item, remove_order_item, cancel_order, complete_order

Be specific and practical in your suggestions, considering the current state of the warehouse."#;

/// Full prompt text: system prompt, optional state as JSON, then the query
pub fn build_prompt(
    system_prompt: &str,
    prompt: &str,
    context: Option<&WarehouseState>,
) -> Result<String> {
    let mut full = system_prompt.to_string();
    if let Some(state) = context {
        let state_json =
            serde_json::to_string_pretty(state).context("Failed to serialize warehouse state")?;
        full.push_str("\n\nCurrent warehouse state:\n```json\n");
        full.push_str(&state_json);
        full.push_str("\n```");
    }
    full.push_str("\n\nUser query: ");
    full.push_str(prompt);
    Ok(full)
}

/// Collect suggested actions from model text.
///
/// Every fenced ```json block contributes its `actions` array. When no
/// block yields any, the whole text is tried as one JSON document.
pub fn extract_actions(text: &str) -> Vec<Value> {
    let mut actions = Vec::new();
    for block in fenced_json_blocks(text) {
        match serde_json::from_str::<Value>(&block) {
            Ok(value) => actions.extend(actions_of(value)),
            Err(e) => warn!(error = %e, "Skipping unparseable JSON block in assistant reply"),
        }
    }

    if actions.is_empty() {
        if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
            actions.extend(actions_of(value));
        }
    }
    actions
}

fn fenced_json_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        let fence = line.trim();
        match current.take() {
            Some(lines) if fence == "```" => blocks.push(lines.join("\n")),
            Some(mut lines) => {
                lines.push(line);
                current = Some(lines);
            }
            None if fence == "```json" => current = Some(Vec::new()),
            None => {}
        }
    }
    blocks
}

fn actions_of(value: Value) -> Vec<Value> {
    match value {
        Value::Object(mut obj) => match obj.remove("actions") {
            Some(Value::Array(actions)) => actions,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
