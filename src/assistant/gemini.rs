use super::{build_prompt, extract_actions, Assistant, AssistantReply, DEFAULT_SYSTEM_PROMPT};
use crate::warehouse::WarehouseState;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// `[assistant]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantConfig {
    /// Unset disables the assistant
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AssistantConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
    top_p: f64,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Client for the Gemini `generateContent` REST endpoint
pub struct GeminiAssistant {
    api_key: String,
    config: AssistantConfig,
    http: Client,
}

impl GeminiAssistant {
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            config,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, text: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: 0.2,
                top_p: 0.8,
                top_k: 40,
            },
        };
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to send Gemini request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Gemini API error");
            return Err(anyhow!("Gemini API error: {} - {}", status, body));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;
        let candidate = reply
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl Assistant for GeminiAssistant {
    async fn ask(&self, prompt: &str, context: Option<&WarehouseState>) -> Result<AssistantReply> {
        let full_prompt = build_prompt(DEFAULT_SYSTEM_PROMPT, prompt, context)?;
        info!(model = %self.config.model, "Sending request to Gemini");
        debug!(prompt = %full_prompt, "Full prompt");

        let response = self.generate(full_prompt).await?;
        let actions = extract_actions(&response);
        info!(
            chars = response.len(),
            actions = actions.len(),
            "Received response from Gemini"
        );

        Ok(AssistantReply {
            response,
            actions,
            model: self.config.model.clone(),
        })
    }
}
