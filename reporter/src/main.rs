use agent_reporter::{ChangeDetectingReporter, ReporterConfig};
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Runs a synthetic agent through a few phases, reporting as it goes.
/// Useful for watching the monitor's WebSocket stream without a real agent.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_reporter=info,simulate_agent=info".into()),
        )
        .init();

    let agent_id = std::env::var("AGENT_ID").unwrap_or_else(|_| "simulated-agent".to_string());
    let config = match std::env::var("AGENT_MONITOR_URL") {
        Ok(url) => ReporterConfig::with_service_url(url),
        Err(_) => ReporterConfig::default(),
    };
    let tick_ms: u64 = std::env::var("SIMULATE_TICK_MS")
        .unwrap_or_else(|_| "500".to_string())
        .parse()
        .context("SIMULATE_TICK_MS must be a number of milliseconds")?;

    info!(
        agent_id = %agent_id,
        service_url = %config.service_url,
        "Simulated agent starting"
    );

    let mut reporter = ChangeDetectingReporter::http(agent_id, &config)?;
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));

    reporter
        .log_state(state(json!({"status": "idle"})), false)
        .await;

    for phase in ["load", "process", "summarize"] {
        for progress in (0..=100).step_by(25) {
            ticker.tick().await;
            // Heartbeat changes every tick but only phase/progress trigger a push
            let tick = reporter.history().len();
            reporter
                .log_state(
                    state(json!({
                        "status": "running",
                        "phase": phase,
                        "progress": progress,
                        "heartbeat": tick,
                    })),
                    false,
                )
                .await;
            ticker.tick().await;
            reporter
                .log_state(
                    state(json!({
                        "status": "running",
                        "phase": phase,
                        "progress": progress,
                        "heartbeat": tick + 1,
                    })),
                    false,
                )
                .await;
        }
    }

    reporter
        .log_state(state(json!({"status": "done"})), true)
        .await;

    info!(logged = reporter.history().len(), "Simulated agent finished");
    Ok(())
}

fn state(value: serde_json::Value) -> agent_reporter::StatePayload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => agent_reporter::StatePayload::new(),
    }
}
