use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the xiaobot backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the backend web UI (player, music list and chat endpoints).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Push channel (now playing / queue ended notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_path")]
    pub path: String,
    /// Reconnect attempts after a close or failed connect before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Backoff unit; attempt `n` waits `2^n * backoff_base_ms`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Carry an unterminated trailing line over to the next stream chunk
    /// instead of classifying every chunk on its own.
    #[serde(default)]
    pub buffer_partial_lines: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON file holding the boolean UI preferences.
    #[serde(default = "default_prefs_file")]
    pub prefs_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            path: default_push_path(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            buffer_partial_lines: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prefs_file: default_prefs_file(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_push_path() -> String {
    "/ws".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_prefs_file() -> PathBuf {
    platform::data_dir().join("prefs.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, writing defaults there if it does not exist.
    pub fn load_from(config_path: &std::path::Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            push: PushConfig::default(),
            chat: ChatConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}
