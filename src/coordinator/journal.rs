use super::action::ActionResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Action,
    Result,
}

/// One journal line. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Raw payload as submitted
    pub action: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
}

impl JournalEntry {
    fn agent(&self) -> Option<&str> {
        self.action.get("agent").and_then(Value::as_str)
    }

    fn action_type(&self) -> Option<&str> {
        self.action.get("type").and_then(Value::as_str)
    }
}

/// Filter for `ActionJournal::query`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogQuery {
    /// Last N entries; 0 means all
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
}

fn default_limit() -> usize {
    10
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            action_type: None,
            agent: None,
        }
    }
}

struct Inner {
    entries: Vec<JournalEntry>,
    mirror: Option<File>,
}

/// Append-only action/result log, optionally mirrored as JSON lines
pub struct ActionJournal {
    inner: Mutex<Inner>,
}

impl ActionJournal {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                mirror: None,
            }),
        }
    }

    /// Journal that also appends every entry to `path`
    pub fn with_mirror(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create journal directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal file {}", path.display()))?;

        Ok(Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                mirror: Some(file),
            }),
        })
    }

    pub fn record_action(&self, action: &Value) {
        self.append(JournalEntry {
            timestamp: Utc::now(),
            kind: EntryKind::Action,
            action: action.clone(),
            result: None,
        });
    }

    pub fn record_result(&self, action: &Value, result: &ActionResult) {
        self.append(JournalEntry {
            timestamp: Utc::now(),
            kind: EntryKind::Result,
            action: action.clone(),
            result: Some(result.clone()),
        });
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last `query.limit` entries, then filtered by type and agent
    pub fn query(&self, query: &LogQuery) -> Vec<JournalEntry> {
        let inner = self.lock();
        let start = match query.limit {
            0 => 0,
            limit => inner.entries.len().saturating_sub(limit),
        };

        inner.entries[start..]
            .iter()
            .filter(|entry| {
                query
                    .action_type
                    .as_deref()
                    .map_or(true, |t| entry.action_type() == Some(t))
            })
            .filter(|entry| {
                query
                    .agent
                    .as_deref()
                    .map_or(true, |a| entry.agent() == Some(a))
            })
            .cloned()
            .collect()
    }

    fn append(&self, entry: JournalEntry) {
        let mut inner = self.lock();
        if let Some(file) = inner.mirror.as_mut() {
            if let Err(e) = write_line(file, &entry) {
                error!(error = %e, "Failed to write to journal file");
            }
        }
        inner.entries.push(entry);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ActionJournal {
    fn default() -> Self {
        Self::new()
    }
}

fn write_line(file: &mut File, entry: &JournalEntry) -> Result<()> {
    let mut line = serde_json::to_vec(entry).context("Failed to serialize journal entry")?;
    line.push(b'\n');
    file.write_all(&line).context("Failed to append journal entry")?;
    Ok(())
}
