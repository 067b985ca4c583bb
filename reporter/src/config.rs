use agent_monitor::state::DEFAULT_HISTORY_CAPACITY;
use serde::Deserialize;
use std::time::Duration;

/// Fields whose change triggers a report
pub const DEFAULT_KEY_FIELDS: [&str; 3] = ["status", "phase", "progress"];

/// Reporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    /// Base of the ingestion endpoint; `/{agent_id}/state` is appended
    #[serde(default = "default_service_url")]
    pub service_url: String,
    /// Payload fields compared against the last report
    #[serde(default = "default_key_fields")]
    pub key_fields: Vec<String>,
    /// Local history entries kept for diagnostics
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_service_url() -> String {
    "http://localhost:8000/api/agents".to_string()
}

fn default_key_fields() -> Vec<String> {
    DEFAULT_KEY_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_request_timeout_ms() -> u64 {
    5000
}

impl ReporterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Point at a different monitor, keeping every other default
    pub fn with_service_url(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            key_fields: default_key_fields(),
            history_capacity: default_history_capacity(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
