use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// Re-export section types owned by their modules
pub use crate::assistant::AssistantConfig;
pub use crate::snapshot::config::SnapshotConfig;

/// Used when `DEPOT_CONFIG` is unset; optional
pub const DEFAULT_CONFIG_PATH: &str = "depot.toml";

/// Complete depot configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_warehouse_name")]
    pub name: String,
    /// Seed demo inventory, fleet and orders when nothing was recovered
    #[serde(default = "default_true")]
    pub seed_demo: bool,
}

fn default_warehouse_name() -> String {
    "Smart Warehouse".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            name: default_warehouse_name(),
            seed_demo: default_true(),
        }
    }
}

/// Action journal mirror file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("logs/actions.jsonl")
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_journal_path(),
        }
    }
}

impl DepotConfig {
    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DEPOT_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("DEPOT_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Some(v) = lookup("DEPOT_SNAPSHOT_DIR") {
            self.snapshot.directory = PathBuf::from(v);
        }
        if let Some(v) = lookup("GOOGLE_API_KEY") {
            self.assistant.api_key = Some(v);
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.assistant.model = v;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<DepotConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Resolve the startup configuration.
///
/// An explicit `DEPOT_CONFIG` must exist; the default path is used only when
/// present. Environment overrides are applied last.
pub fn load_from_env() -> Result<DepotConfig> {
    let mut config = match std::env::var("DEPOT_CONFIG") {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        Err(_) => DepotConfig::default(),
    };
    config.apply_env();
    Ok(config)
}
