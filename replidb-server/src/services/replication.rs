//! Replication service - health in the legacy wire shape, plus the
//! orchestrator passthrough

use std::sync::Arc;

use replidb_core::{ConnectionSet, HealthSnapshot};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::orchestrator::{OrchestratorClient, OrchestratorError};

/// Legacy wire shape; the master/slaves field names are part of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationStatus {
    pub master: &'static str,
    pub slaves_count: usize,
    pub slaves_total: usize,
    pub status: String,
}

impl From<HealthSnapshot> for ReplicationStatus {
    fn from(snapshot: HealthSnapshot) -> Self {
        let master = if snapshot.primary_healthy {
            "healthy"
        } else {
            "unhealthy"
        };
        Self {
            master,
            slaves_count: snapshot.healthy_replicas,
            slaves_total: snapshot.total_replicas,
            status: format!(
                "Master: {}, Healthy slaves: {}/{}",
                master, snapshot.healthy_replicas, snapshot.total_replicas
            ),
        }
    }
}

pub struct ReplicationService<DB: sqlx::Database> {
    db: Arc<ConnectionSet<DB>>,
    orchestrator: OrchestratorClient,
}

impl<DB: sqlx::Database> Clone for ReplicationService<DB> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<DB: sqlx::Database> ReplicationService<DB> {
    pub fn new(db: Arc<ConnectionSet<DB>>, orchestrator: OrchestratorClient) -> Self {
        Self { db, orchestrator }
    }

    pub async fn status(&self) -> ReplicationStatus {
        self.db.status().await.into()
    }

    pub async fn orchestrator(&self) -> Result<Map<String, Value>, OrchestratorError> {
        self.orchestrator.first_cluster().await
    }
}
