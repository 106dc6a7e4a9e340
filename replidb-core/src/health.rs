//! Health aggregation - probes every node on demand
//!
//! No caching and no background polling: each call pings the primary and
//! all replicas concurrently, so latency is bounded by the slowest probe
//! (capped by the topology's probe timeout). Counts refer to the live
//! replica set, i.e. replicas dropped at open time are not counted.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use sqlx::{Connection, Database};
use tracing::{debug, warn};

use crate::connection::{ping_direct, ConnectionSet, Node};
use crate::topology::Target;

/// Point-in-time view of topology health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub primary_healthy: bool,
    pub healthy_replicas: usize,
    pub total_replicas: usize,
}

impl HealthSnapshot {
    /// True when any node failed its probe.
    pub fn is_degraded(&self) -> bool {
        !self.primary_healthy || self.healthy_replicas < self.total_replicas
    }
}

impl<DB: Database> ConnectionSet<DB> {
    /// Probe every node and summarize. Never fails; unreachable nodes are
    /// simply counted as unhealthy.
    pub async fn status(&self) -> HealthSnapshot {
        let timeout = self.probe_timeout;
        let (primary_healthy, replicas) = tokio::join!(
            probe(&self.primary, timeout),
            join_all(self.replicas.iter().map(|node| probe(node, timeout))),
        );

        HealthSnapshot {
            primary_healthy,
            healthy_replicas: replicas.into_iter().filter(|healthy| *healthy).count(),
            total_replicas: self.replicas.len(),
        }
    }
}

/// Ping over an idle pooled connection when one is free, otherwise over a
/// dedicated connection. A released pool counts as unhealthy.
async fn probe<DB: Database>(node: &Node<DB>, timeout: Duration) -> bool {
    if node.pool.is_closed() {
        warn!(node = %node.target, "health probe skipped, pool is closed");
        return false;
    }

    let check = async {
        match node.pool.try_acquire() {
            Some(mut conn) => conn.ping().await,
            None => {
                debug!(node = %node.target, "no idle connection, probing directly");
                ping_direct::<DB>(&node.options).await
            }
        }
    };
    bounded(&node.target, timeout, check).await
}

async fn bounded<F>(target: &Target, timeout: Duration, check: F) -> bool
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    match tokio::time::timeout(timeout, check).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(node = %target, error = %e, "health probe failed");
            false
        }
        Err(_) => {
            warn!(node = %target, timeout = ?timeout, "health probe timed out");
            false
        }
    }
}
