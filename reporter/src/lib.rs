//! Agent Reporter - change-detecting state push for monitored agents.
//!
//! An agent process owns one [`ChangeDetectingReporter`] and hands it every
//! state it passes through. The reporter keeps a local bounded history and
//! only pushes to the monitor's ingestion endpoint when a tracked key field
//! changed (or the caller forces it).
//!
//! ```text
//!   Agent control loop
//!          ↓ log_state(state)
//! ┌─────────────────────────────────────────┐
//! │       ChangeDetectingReporter            │
//! │  - Local ring buffer (100 entries)       │
//! │  - Key field diff vs. last report        │
//! └─────────────────────────────────────────┘
//!          ↓ StateSink::deliver (if changed)
//!   POST /api/agents/{agent_id}/state
//!          ↓
//!     Broadcast hub → observers
//! ```
//!
//! Delivery failures are logged and swallowed; monitoring being down never
//! disturbs the agent.
//!
//! # Example
//!
//! ```no_run
//! use agent_reporter::{ChangeDetectingReporter, ReporterConfig};
//! use serde_json::json;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut reporter = ChangeDetectingReporter::http("agent-1", &ReporterConfig::default())?;
//!
//! let state = json!({"status": "running", "progress": 10});
//! reporter.log_state(state.as_object().cloned().unwrap(), false).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod reporter;
mod sink;

pub use config::{ReporterConfig, DEFAULT_KEY_FIELDS};
pub use reporter::ChangeDetectingReporter;
pub use sink::{HttpStateSink, StateSink};

pub use agent_monitor::StatePayload;
