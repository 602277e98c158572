//! Configuration management with XDG paths
//!
//! ~/.config/ghostshell/config.json - API key, model, timings (0600)
//! ~/.local/state/ghostshell/       - Log file and completion audit records

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use crate::scrollback::DEFAULT_SCROLLBACK_CHARS;

const APP_NAME: &str = "ghostshell";

/// Environment variable that overrides the configured API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Get config directory (~/.config/ghostshell/)
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .context("Could not determine config directory")?;
    Ok(base.join(APP_NAME))
}

/// Get state directory (~/.local/state/ghostshell/)
pub fn state_dir() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .context("Could not determine state directory")?;
    Ok(base.join(APP_NAME))
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Default log file
pub fn log_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("ghostshell.log"))
}

/// Ensure all directories exist
pub fn ensure_dirs() -> Result<()> {
    fs::create_dir_all(config_dir()?)?;
    fs::create_dir_all(state_dir()?)?;
    Ok(())
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model to ask for completions
    #[serde(default = "default_model")]
    pub model: String,

    /// Quiet period before a suggestion is requested
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Characters of shell output kept as context
    #[serde(default = "default_scrollback_chars")]
    pub scrollback_chars: usize,

    /// Give up on a completion after this long
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Generation cap per suggestion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Shell to run; $SHELL when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Persist every exchange under the state directory
    #[serde(default = "default_true")]
    pub audit: bool,
}

fn default_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4".to_string() }
fn default_debounce_ms() -> u64 { 500 }
fn default_scrollback_chars() -> usize { DEFAULT_SCROLLBACK_CHARS }
fn default_request_timeout_secs() -> u64 { 15 }
fn default_max_tokens() -> u32 { 64 }
fn default_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            debounce_ms: default_debounce_ms(),
            scrollback_chars: default_scrollback_chars(),
            request_timeout_secs: default_request_timeout_secs(),
            max_tokens: default_max_tokens(),
            shell: None,
            audit: default_true(),
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults
    pub fn load() -> Result<Self> {
        ensure_dirs()?;
        let path = config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk with secure permissions
    pub fn save(&self) -> Result<()> {
        ensure_dirs()?;
        let path = config_path()?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // API key lives here
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;

        Ok(())
    }

    /// Set a value by CLI key name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "key" | "api_key" => self.api_key = Some(value.to_string()),
            "api_base" | "base" => self.api_base = value.to_string(),
            "model" => self.model = value.to_string(),
            "shell" => self.shell = Some(value.to_string()),
            "debounce_ms" | "debounce" => {
                self.debounce_ms = value
                    .parse()
                    .with_context(|| format!("Invalid debounce_ms: {}", value))?;
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: key, api_base, model, shell, debounce_ms",
                key
            ),
        }
        Ok(())
    }

    /// API key from environment or config
    pub fn resolve_api_key(&self) -> Option<String> {
        // Environment variable takes precedence
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                return Some(key);
            }
        }
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    /// Shell from config, then $SHELL, then bash
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "bash".to_string())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
