//! Shared fixtures: a "cluster" of independent SQLite files.
//!
//! Nothing replicates between the files, so every row a test finds on a
//! node was put there by a statement routed to that node.

#![allow(dead_code)]

use replidb_core::Topology;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tempfile::TempDir;

pub struct Cluster {
    pub dir: TempDir,
    pub primary: String,
    pub replicas: Vec<String>,
}

impl Cluster {
    /// Primary plus `replicas` replica files, each seeded with its own name.
    pub async fn new(replicas: usize) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        let primary = path("primary.db");
        seed(&primary, "primary").await;

        let mut replica_paths = Vec::with_capacity(replicas);
        for i in 0..replicas {
            let name = format!("replica-{i}");
            let address = path(&format!("{name}.db"));
            seed(&address, &name).await;
            replica_paths.push(address);
        }

        Self {
            dir,
            primary,
            replicas: replica_paths,
        }
    }

    pub fn topology(&self) -> Topology {
        self.replicas
            .iter()
            .fold(Topology::new(self.primary.clone(), 4, 1), |t, r| {
                t.with_replica(r.clone())
            })
    }

    /// An address that can never be opened (its directory does not exist).
    pub fn unreachable(&self, name: &str) -> String {
        self.dir
            .path()
            .join("does-not-exist")
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }
}

async fn open(address: &str) -> SqlitePool {
    SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(address)
            .create_if_missing(true),
    )
    .await
    .expect("open sqlite node")
}

/// Create the fixture schema on one node.
pub async fn seed(address: &str, name: &str) {
    let pool = open(address).await;
    sqlx::query("CREATE TABLE node (name TEXT NOT NULL)")
        .execute(&pool)
        .await
        .expect("create node table");
    sqlx::query("INSERT INTO node (name) VALUES (?)")
        .bind(name)
        .execute(&pool)
        .await
        .expect("insert node name");
    sqlx::query(
        "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL UNIQUE)",
    )
    .execute(&pool)
    .await
    .expect("create items table");
    pool.close().await;
}

/// Count rows in `items` on one node, bypassing the connection set.
pub async fn count_items(address: &str) -> i64 {
    let pool = open(address).await;
    let row = sqlx::query("SELECT COUNT(*) AS n FROM items")
        .fetch_one(&pool)
        .await
        .expect("count items");
    let n: i64 = row.get("n");
    pool.close().await;
    n
}
