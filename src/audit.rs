//! Completion audit log
//!
//! Every successful exchange is written to its own file under
//! ~/.local/state/ghostshell/completions/ so prompts can be inspected later:
//! - `<YYYYMMDD-HHMMSS>-<suffix>.json`: messages sent plus the assistant reply

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::completion::ChatMessage;
use crate::config;

/// One completed remote call. Written once, never touched again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionExchange {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub suggestion: String,
    pub latency_ms: u64,
}

impl CompletionExchange {
    /// `messages` are the ones sent; the reply is appended as the assistant turn.
    pub fn new(model: &str, mut messages: Vec<ChatMessage>, suggestion: String, latency_ms: u64) -> Self {
        messages.push(ChatMessage::assistant(&suggestion));
        Self {
            id: generate_exchange_id(),
            created_at: Utc::now(),
            model: model.to_string(),
            messages,
            suggestion,
            latency_ms,
        }
    }
}

/// Directory of exchange records
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Open (and create) the audit directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Default location under the state directory
    pub fn open_default() -> Result<Self> {
        Self::open(completions_dir()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one exchange; returns the file written
    pub fn record(&self, exchange: &CompletionExchange) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.json", exchange.id));
        let tmp_path = self.dir.join(format!(".{}.json.tmp", exchange.id));
        let content = serde_json::to_string_pretty(exchange)?;

        fs::write(&tmp_path, &content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// Load every record, oldest first
    pub fn list(&self) -> Result<Vec<CompletionExchange>> {
        let mut exchanges = Vec::new();

        for entry in fs::read_dir(&self.dir)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(exchange) = serde_json::from_str::<CompletionExchange>(&content) {
                    exchanges.push(exchange);
                }
            }
        }

        exchanges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(exchanges)
    }
}

/// ~/.local/state/ghostshell/completions/
pub fn completions_dir() -> Result<PathBuf> {
    Ok(config::state_dir()?.join("completions"))
}

/// Timestamp plus a random suffix so concurrent exchanges never collide
fn generate_exchange_id() -> String {
    let now = Utc::now();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%d-%H%M%S%.3f"), &suffix[..8])
}
