//! Connection set - one primary pool plus the replica pools that came up
//!
//! Built once at startup. The primary is mandatory; replicas are
//! best-effort and a replica that cannot be reached is left out of the set
//! rather than failing startup. Pools are never added or removed afterwards.

use std::future::Future;
use std::iter;
use std::time::Duration;

use sqlx::pool::{Pool, PoolOptions};
use sqlx::{Connection, Database};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::driver::{ConnectOptions, Driver};
use crate::error::{CloseFailure, Error, Result};
use crate::topology::{Target, Topology};

/// Idle connections above the `max_idle` floor are released after this long.
const IDLE_RELEASE_AFTER: Duration = Duration::from_secs(60);

/// One database node, its pool, and the options the pool was opened with
pub(crate) struct Node<DB: Database> {
    pub(crate) target: Target,
    pub(crate) pool: Pool<DB>,
    pub(crate) options: ConnectOptions<DB>,
}

/// Owns every pool of the topology and routes statements across them.
///
/// Safe to share between tasks (wrap in an `Arc`); each pool multiplexes a
/// bounded number of physical connections.
pub struct ConnectionSet<DB: Database> {
    pub(crate) primary: Node<DB>,
    pub(crate) replicas: Vec<Node<DB>>,
    pub(crate) probe_timeout: Duration,
    shutdown_timeout: Duration,
}

impl<DB: Driver> ConnectionSet<DB> {
    /// Connect to the primary, then to each replica in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] for the primary if it is unreachable, in
    /// which case no replica is attempted. Replica failures are logged and
    /// never returned.
    pub async fn open(topology: &Topology) -> Result<Self> {
        topology.validate()?;

        let primary_target = Target::Primary {
            address: topology.primary.clone(),
        };
        let primary = match connect::<DB>(topology, primary_target.clone()).await {
            Ok(node) => node,
            Err(e) => {
                error!(node = %primary_target, error = %e, "failed to connect to primary");
                return Err(e);
            }
        };

        let mut replicas = Vec::with_capacity(topology.replicas.len());
        for (index, address) in topology.replicas.iter().enumerate() {
            let target = Target::Replica {
                index,
                address: address.clone(),
            };
            match connect::<DB>(topology, target.clone()).await {
                Ok(node) => replicas.push(node),
                Err(e) => {
                    warn!(node = %target, error = %e, "failed to connect to replica, excluding it");
                }
            }
        }

        if replicas.is_empty() {
            warn!("no replicas connected, reads will be served by the primary");
        }

        info!(
            primary = %topology.primary,
            replicas = replicas.len(),
            configured = topology.replicas.len(),
            "connection set opened"
        );

        Ok(Self {
            primary,
            replicas,
            probe_timeout: topology.probe_timeout(),
            shutdown_timeout: topology.shutdown_timeout(),
        })
    }
}

impl<DB: Database> ConnectionSet<DB> {
    /// Number of replicas that were reachable at open time.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    pub fn primary_target(&self) -> &Target {
        &self.primary.target
    }

    pub fn replica_targets(&self) -> impl Iterator<Item = &Target> {
        self.replicas.iter().map(|node| &node.target)
    }

    /// Release the primary pool, then every replica pool.
    ///
    /// Each pool waits for borrowed connections to come back, up to the
    /// topology's shutdown timeout. A pool that does not drain in time is
    /// recorded and the remaining pools are still released.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Close`] listing every pool that failed to release.
    pub async fn close(&self) -> Result<()> {
        let mut failures = Vec::new();

        for node in iter::once(&self.primary).chain(&self.replicas) {
            match tokio::time::timeout(self.shutdown_timeout, node.pool.close()).await {
                Ok(()) => debug!(node = %node.target, "pool closed"),
                Err(_) => {
                    warn!(
                        node = %node.target,
                        timeout = ?self.shutdown_timeout,
                        "pool did not drain before shutdown timeout"
                    );
                    failures.push(CloseFailure {
                        target: node.target.clone(),
                        reason: format!(
                            "in-flight operations did not finish within {:?}",
                            self.shutdown_timeout
                        ),
                    });
                }
            }
        }

        if failures.is_empty() {
            info!("connection set closed");
            Ok(())
        } else {
            Err(Error::Close { failures })
        }
    }
}

/// Open a pool for one node and verify it answers before handing it out.
async fn connect<DB: Driver>(topology: &Topology, target: Target) -> Result<Node<DB>> {
    let options = DB::connect_options(topology, target.address())?;
    let bounds = topology.pool_bounds();

    let pool = PoolOptions::<DB>::new()
        .max_connections(bounds.max_open)
        .min_connections(bounds.max_idle)
        .idle_timeout(IDLE_RELEASE_AFTER)
        .max_lifetime(bounds.max_lifetime)
        .acquire_timeout(topology.connect_timeout())
        .connect_with(options.clone())
        .await
        .map_err(|source| Error::Connect {
            target: target.clone(),
            source,
        })?;

    if let Err(source) = ping(&pool).await {
        pool.close().await;
        return Err(Error::Connect {
            target: target.clone(),
            source,
        });
    }

    debug!(node = %target, "connected");
    Ok(Node {
        target,
        pool,
        options,
    })
}

/// Reachability check: borrow a connection and ping it.
async fn ping<DB: Database>(pool: &Pool<DB>) -> std::result::Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

/// Reachability check that bypasses the pool: connect, ping, disconnect.
///
/// Used when every pooled connection is busy, so a saturated pool is not
/// mistaken for an unreachable node.
pub(crate) async fn ping_direct<DB: Database>(
    options: &ConnectOptions<DB>,
) -> std::result::Result<(), sqlx::Error> {
    let mut conn = DB::Connection::connect_with(options).await?;
    conn.ping().await?;
    conn.close().await
}

/// Race a statement against the caller's cancellation token.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, statement: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = statement => result.map_err(Error::Statement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Sqlite;
    use tempfile::TempDir;

    fn path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn replica_with_bad_address_is_skipped() {
        let dir = TempDir::new().unwrap();
        let topology = Topology::new(path(&dir, "primary.db"), 2, 1)
            .with_replica(path(&dir, "replica-0.db"))
            .with_replica(path(&dir, "missing/replica-1.db"));

        let db = ConnectionSet::<Sqlite>::open(&topology).await.unwrap();

        let targets: Vec<_> = db.replica_targets().cloned().collect();
        assert_eq!(
            targets,
            vec![Target::Replica {
                index: 0,
                address: path(&dir, "replica-0.db"),
            }]
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancellable_prefers_fired_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, async { Ok::<_, sqlx::Error>(1) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn close_reports_pool_that_never_drains() {
        let dir = TempDir::new().unwrap();
        let mut topology = Topology::new(path(&dir, "primary.db"), 2, 0)
            .with_replica(path(&dir, "replica-0.db"));
        topology.shutdown_timeout_secs = 1;

        let db = ConnectionSet::<Sqlite>::open(&topology).await.unwrap();
        let held = db.primary.pool.acquire().await.unwrap();

        let err = db.close().await.unwrap_err();
        match err {
            Error::Close { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].target.is_primary());
            }
            other => panic!("unexpected error: {other}"),
        }

        // The replica was still released despite the primary failure.
        assert!(db.replicas[0].pool.is_closed());
        drop(held);
    }
}
