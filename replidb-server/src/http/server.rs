//! Axum server setup
//!
//! Server skeleton with:
//! - Tracing middleware and a request timeout
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use replidb_core::{CancellationToken, ConnectionSet};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::orchestrator::OrchestratorClient;
use crate::services::{ReplicationService, UserService};

/// Database the HTTP layer is served from
pub type Db = sqlx::MySql;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8080)
    pub bind_addr: SocketAddr,

    /// Ceiling for a single request (default: 10s)
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub users: UserService<Db>,
    pub replication: ReplicationService<Db>,
    /// Root token; handlers derive a child per request and shutdown cancels it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: Arc<ConnectionSet<Db>>, orchestrator: OrchestratorClient) -> Self {
        Self {
            users: UserService::new(Arc::clone(&db)),
            replication: ReplicationService::new(db, orchestrator),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the application router with all routes
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_router());
    with_middleware(router, config).with_state(state)
}

fn with_middleware<S>(router: Router<S>, config: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until a shutdown signal arrives or `state.shutdown`
/// is cancelled.
///
/// # Example
///
/// ```ignore
/// let db = Arc::new(ConnectionSet::<Db>::open(&topology).await?);
/// let state = Arc::new(AppState::new(Arc::clone(&db), orchestrator));
/// run_server(state, ServerConfig::default()).await?;
/// db.close().await?;
/// ```
pub async fn run_server(state: Arc<AppState>, config: ServerConfig) -> Result<(), ServerError> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state, &config);

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then cancel in-flight calls.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
        _ = token.cancelled() => {
            tracing::info!("Shutdown requested");
        }
    }

    token.cancel();
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
