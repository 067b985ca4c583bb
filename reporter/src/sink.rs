use crate::config::ReporterConfig;
use agent_monitor::StatePayload;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};

/// Destination for reported agent states.
///
/// The reporter only calls this when a report is due; implementations
/// decide how the state reaches the monitor.
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Push one state for `agent_id`. Any error is treated as a failed delivery.
    async fn deliver(&self, agent_id: &str, state: &StatePayload) -> Result<()>;
}

/// Pushes states to the monitor's HTTP ingestion endpoint
pub struct HttpStateSink {
    http_client: Client,
    service_url: Url,
}

impl HttpStateSink {
    pub fn new(config: &ReporterConfig) -> Result<Self> {
        let service_url = Url::parse(&config.service_url)
            .with_context(|| format!("Invalid service URL: {}", config.service_url))?;
        if service_url.cannot_be_a_base() {
            bail!("Service URL cannot take a path: {}", config.service_url);
        }

        let http_client = Client::builder()
            .user_agent("agent-reporter/0.1")
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            service_url,
        })
    }

    /// `{service_url}/{agent_id}/state`, with the agent id percent-encoded
    pub fn state_url(&self, agent_id: &str) -> Result<Url> {
        let mut url = self.service_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Service URL cannot take a path"))?
            .pop_if_empty()
            .push(agent_id)
            .push("state");
        Ok(url)
    }
}

#[async_trait]
impl StateSink for HttpStateSink {
    async fn deliver(&self, agent_id: &str, state: &StatePayload) -> Result<()> {
        let url = self.state_url(agent_id)?;

        let response = self
            .http_client
            .post(url)
            .json(state)
            .send()
            .await
            .context("Failed to reach monitoring service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Monitoring service returned {}: {}", status, body);
        }

        Ok(())
    }
}
