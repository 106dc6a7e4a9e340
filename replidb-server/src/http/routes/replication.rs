//! Replication endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::services::ReplicationStatus;

/// GET /replication/status - never fails; unhealthy nodes show in the payload
async fn status(State(state): State<Arc<AppState>>) -> Json<ReplicationStatus> {
    Json(state.replication.status().await)
}

/// GET /replication/orchestrator - first cluster known to the orchestrator
async fn orchestrator(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let cluster = state.replication.orchestrator().await?;
    Ok(Json(cluster))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/replication/status", get(status))
        .route("/replication/orchestrator", get(orchestrator))
}
