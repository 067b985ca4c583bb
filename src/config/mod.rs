use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::state::DEFAULT_HISTORY_CAPACITY;

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub observers: ObserverConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Attach a permissive CORS layer (dashboard served from another origin)
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

/// Per-agent history retention
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Snapshots retained per agent
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
    /// Entries returned by history queries that omit `limit`
    #[serde(default = "default_history_limit")]
    pub default_limit: i64,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_history_limit() -> i64 {
    20
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
            default_limit: default_history_limit(),
        }
    }
}

/// Observer fan-out tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    /// Frames queued per observer before sends start waiting
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// How long a send to a full queue may wait before the observer is evicted
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_send_timeout_ms() -> u64 {
    250
}

impl ObserverConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

/// HTTP API limits
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Largest accepted ingestion body
    #[serde(default = "default_body_size_limit")]
    pub body_size_limit_bytes: usize,
}

fn default_body_size_limit() -> usize {
    1_048_576 // 1 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            body_size_limit_bytes: default_body_size_limit(),
        }
    }
}

impl MonitorConfig {
    /// Apply `AGENT_MONITOR_*` environment overrides. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("AGENT_MONITOR_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(n) = lookup("AGENT_MONITOR_HISTORY_CAPACITY").and_then(|v| v.parse().ok()) {
            self.history.capacity = n;
        }
        if let Some(n) = lookup("AGENT_MONITOR_SEND_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.observers.send_timeout_ms = n;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<MonitorConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let config: MonitorConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    Ok(config)
}
