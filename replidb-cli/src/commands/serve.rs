//! HTTP server command
//!
//! Opens the topology, serves until shutdown, then releases every pool.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use replidb_core::ConnectionSet;
use replidb_server::{run_server, AppState, Db, OrchestratorClient, ServerConfig};

use crate::config::AppConfig;

/// Run the HTTP server
pub async fn run_serve(config: AppConfig) -> Result<()> {
    let db = Arc::new(
        ConnectionSet::<Db>::open(&config.database)
            .await
            .context("Failed to open database topology")?,
    );
    let orchestrator = OrchestratorClient::new(&config.orchestrator)
        .context("Failed to build orchestrator client")?;
    tracing::info!(url = %orchestrator.url(), "orchestrator client ready");

    let server_config = ServerConfig {
        bind_addr: SocketAddr::from(([0, 0, 0, 0], config.http.port)),
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(Arc::clone(&db), orchestrator));

    // Blocks until shutdown
    let served = run_server(state, server_config).await.context("Server error");

    // Release pools even when the server failed
    let closed = db.close().await.context("Failed to close database connections");
    served?;
    closed
}
