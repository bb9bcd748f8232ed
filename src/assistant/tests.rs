use super::*;
use crate::warehouse::Floor;
use mockito::{Matcher, Server};
use serde_json::json;

fn config(base_url: String) -> AssistantConfig {
    AssistantConfig {
        api_key: Some("test-key".to_string()),
        base_url,
        ..AssistantConfig::default()
    }
}

#[test]
fn test_extract_actions_from_fenced_blocks() {
    let text = r#"Two things need attention.

```json
{"actions": [{"type": "t", "agent": "agv", "action": "charge_agv", "agv_id": "AGV002"}]}
```

Then restock:

```json
{
  "actions": [
    {"type": "t", "agent": "restock", "action": "auto_restock", "product_id": "P005"}
  ]
}
```
"#;

    let actions = extract_actions(text);

    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0]["action"], "charge_agv");
    assert_eq!(actions[1]["product_id"], "P005");
}

#[test]
fn test_extract_actions_skips_bad_blocks() {
    let text = "```json\n{not json\n```\n```json\n{\"notes\": []}\n```\n```json\n{\"actions\": [{\"agent\": \"order\"}]}\n```";

    let actions = extract_actions(text);

    assert_eq!(actions, vec![json!({"agent": "order"})]);
}

#[test]
fn test_extract_actions_whole_text_fallback() {
    let text = r#" {"actions": [{"agent": "inventory", "action": "get_inventory_status", "type": "t"}]} "#;
    assert_eq!(extract_actions(text).len(), 1);
}

#[test]
fn test_extract_actions_none() {
    assert!(extract_actions("Everything looks fine.").is_empty());
    assert!(extract_actions("```\nplain code\n```").is_empty());
    assert!(extract_actions(r#"{"actions": "later"}"#).is_empty());
}

#[test]
fn test_build_prompt_with_state() {
    let floor = Floor::new("Prompt Warehouse");
    let state = WarehouseState::capture(&floor, Vec::new());

    let prompt = build_prompt("SYSTEM", "What now?", Some(&state)).unwrap();

    assert!(prompt.starts_with("SYSTEM\n\nCurrent warehouse state:\n```json\n"));
    assert!(prompt.contains("\"name\": \"Prompt Warehouse\""));
    assert!(prompt.ends_with("\n\nUser query: What now?"));

    let bare = build_prompt("SYSTEM", "Hi", None).unwrap();
    assert_eq!(bare, "SYSTEM\n\nUser query: Hi");
}

#[test]
fn test_config_defaults() {
    let config = AssistantConfig::default();
    assert_eq!(config.model, "gemini-1.5-pro");
    assert_eq!(config.max_tokens, 1000);
    assert!(!config.is_configured());
    assert!(GeminiAssistant::new(config).is_err());

    let blank = AssistantConfig {
        api_key: Some(String::new()),
        ..AssistantConfig::default()
    };
    assert!(!blank.is_configured());
}

#[tokio::test]
async fn test_gemini_round_trip() {
    let mut server = Server::new_async().await;
    let reply_text = "Charge it.\n```json\n{\"actions\": [{\"type\": \"t\", \"agent\": \"agv\", \"action\": \"charge_agv\", \"agv_id\": \"AGV001\"}]}\n```";
    let mock = server
        .mock("POST", "/models/gemini-1.5-pro:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(json!({
            "generationConfig": {
                "maxOutputTokens": 1000,
                "temperature": 0.2,
                "topP": 0.8,
                "topK": 40
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{"content": {"parts": [{"text": reply_text}]}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let assistant = GeminiAssistant::new(config(server.url())).unwrap();
    let reply = assistant.ask("Anything low?", None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply.response, reply_text);
    assert_eq!(reply.model, "gemini-1.5-pro");
    assert_eq!(reply.actions.len(), 1);
    assert_eq!(reply.actions[0]["agv_id"], "AGV001");
}

#[tokio::test]
async fn test_gemini_api_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-1.5-pro:generateContent")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("quota exceeded")
        .create_async()
        .await;

    let assistant = GeminiAssistant::new(config(server.url())).unwrap();
    let err = assistant.ask("Hello", None).await.unwrap_err();

    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_gemini_no_candidates() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-1.5-pro:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let assistant = GeminiAssistant::new(config(server.url())).unwrap();
    let err = assistant.ask("Hello", None).await.unwrap_err();

    assert!(err.to_string().contains("no candidates"));
}
