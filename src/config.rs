// src/config.rs
// Client configuration loaded from ~/.hal-chat/config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Agent WebSocket base URL (identity is appended as /ws/{identity})
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Agent HTTP base URL for session/memory browsing
    #[serde(default = "default_http_url")]
    pub http_url: String,

    /// Identity to connect as; a fresh one is generated when unset
    #[serde(default)]
    pub identity: Option<String>,

    /// Default verbose mode
    #[serde(default)]
    pub verbose: bool,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

fn default_backend_url() -> String {
    "ws://localhost:8080".to_string()
}

fn default_http_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            http_url: default_http_url(),
            identity: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from ~/.hal-chat/config.json
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| "Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to ~/.hal-chat/config.json
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the ~/.hal-chat directory path
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".hal-chat"))
    }
}
