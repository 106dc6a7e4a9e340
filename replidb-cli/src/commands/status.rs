//! One-shot health probe of the configured topology

use anyhow::{Context, Result};
use replidb_core::ConnectionSet;
use replidb_server::Db;

use crate::config::AppConfig;

/// Print the health snapshot as JSON
pub async fn run_status(config: AppConfig) -> Result<()> {
    let db = ConnectionSet::<Db>::open(&config.database)
        .await
        .context("Failed to open database topology")?;

    let snapshot = db.status().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    db.close()
        .await
        .context("Failed to close database connections")
}
