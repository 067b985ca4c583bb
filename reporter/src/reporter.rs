use crate::config::ReporterConfig;
use crate::sink::{HttpStateSink, StateSink};
use agent_monitor::state::BoundedHistory;
use agent_monitor::StatePayload;
use anyhow::Result;
use serde_json::Value;
use tracing::{error, info};

/// Records an agent's states locally and pushes the ones that matter.
///
/// A state is pushed when it is the first one, when `force_report` is set,
/// or when any configured key field differs from the last pushed state
/// (a field present on only one side counts as different). Other fields
/// never trigger a push on their own.
pub struct ChangeDetectingReporter<S: StateSink> {
    agent_id: String,
    sink: S,
    key_fields: Vec<String>,
    history: BoundedHistory<StatePayload>,
    last_reported: Option<StatePayload>,
}

impl ChangeDetectingReporter<HttpStateSink> {
    /// Reporter that pushes over HTTP to `config.service_url`
    pub fn http(agent_id: impl Into<String>, config: &ReporterConfig) -> Result<Self> {
        let sink = HttpStateSink::new(config)?;
        Ok(Self::new(agent_id, sink, config))
    }
}

impl<S: StateSink> ChangeDetectingReporter<S> {
    pub fn new(agent_id: impl Into<String>, sink: S, config: &ReporterConfig) -> Self {
        Self {
            agent_id: agent_id.into(),
            sink,
            key_fields: config.key_fields.clone(),
            history: BoundedHistory::new(config.history_capacity),
            last_reported: None,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Record `state` and push it if it is a meaningful change.
    ///
    /// Never fails: delivery errors are logged and dropped. Returns whether a
    /// push was attempted. After an attempt, `state` becomes the comparison
    /// baseline even if the delivery failed.
    pub async fn log_state(&mut self, state: StatePayload, force_report: bool) -> bool {
        self.history.push(state.clone());

        info!(
            agent_id = %self.agent_id,
            state = %serde_json::to_string(&state).unwrap_or_default(),
            "Agent state"
        );

        if !(force_report || self.state_changed(&state)) {
            return false;
        }

        if let Err(e) = self.sink.deliver(&self.agent_id, &state).await {
            error!(
                agent_id = %self.agent_id,
                error = %e,
                "Failed to notify monitoring service"
            );
        }
        self.last_reported = Some(state);

        true
    }

    /// True if `state` differs from the last pushed state in any key field
    pub fn state_changed(&self, state: &StatePayload) -> bool {
        let Some(last) = &self.last_reported else {
            return true;
        };

        self.key_fields
            .iter()
            .any(|field| match (state.get(field), last.get(field)) {
                (Some(a), Some(b)) => !values_equal(a, b),
                (a, b) => a.is_some() != b.is_some(),
            })
    }

    /// Copy of the local history, oldest first
    pub fn history(&self) -> Vec<StatePayload> {
        self.history.to_vec()
    }

    pub fn last_reported_state(&self) -> Option<&StatePayload> {
        self.last_reported.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// JSON equality where numbers compare by value, so `5` equals `5.0`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
