use agent_monitor::api::{
    create_history_router, create_ingestion_router, create_query_router, create_ws_router,
    AppState, HistoryAppState, QueryAppState, WsAppState,
};
use agent_monitor::config::{load_config, MonitorConfig};
use agent_monitor::BroadcastHub;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_monitor=info".into()),
        )
        .init();

    info!("Agent monitor starting...");

    let mut config = match std::env::var("AGENT_MONITOR_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        Err(_) => MonitorConfig::default(),
    };
    config.apply_env_overrides();

    let hub = Arc::new(BroadcastHub::from_config(&config));

    let mut app = Router::new()
        .merge(create_ingestion_router(AppState {
            hub: Arc::clone(&hub),
            body_size_limit: config.api.body_size_limit_bytes,
        }))
        .merge(create_history_router(Arc::new(HistoryAppState {
            hub: Arc::clone(&hub),
            default_limit: config.history.default_limit,
        })))
        .merge(create_query_router(Arc::new(QueryAppState {
            hub: Arc::clone(&hub),
        })))
        .merge(create_ws_router(Arc::new(WsAppState {
            hub: Arc::clone(&hub),
            default_history_limit: config.history.default_limit,
        })));

    if config.server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!(
        addr = %config.server.bind_addr,
        history_capacity = config.history.capacity,
        "Listening for agents and observers"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&hub)))
        .await
        .context("Server error")?;

    info!("Agent monitor stopped");

    Ok(())
}

/// Wait for ctrl-c, then drop every observer so open WebSockets close and
/// graceful shutdown can complete
async fn shutdown_signal(hub: Arc<BroadcastHub>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    hub.shutdown();
}
