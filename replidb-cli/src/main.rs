//! replidb - primary/replica data-access service
//!
//! - `serve` (default): HTTP API over the configured topology
//! - `status`: probe every node once and print the health snapshot

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

use config::AppConfig;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "replidb",
    author,
    version,
    about = "Primary/replica database access service",
    long_about = "Routes writes to the primary and reads to a random replica, \
                  and reports replication health over HTTP."
)]
struct Cli {
    /// Config file (default: configs/config.<APP_ENV>.yaml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server (default)
    Serve,
    /// Probe the topology once and print its health as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug })?;

    let path = config::resolve_path(cli.config, std::env::var("APP_ENV").ok());
    let config = AppConfig::load(&path)?;
    tracing::debug!(path = %path.display(), "configuration loaded");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::run_serve(config).await?,
        Commands::Status => commands::run_status(config).await?,
    }
    Ok(())
}
