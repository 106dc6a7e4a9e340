//! replidb-server: HTTP service over a primary/replica MySQL topology
//!
//! Users are written through the primary and read from a random replica;
//! replication health and the orchestrator's cluster view are exposed as-is.

pub mod http;
pub mod models;
pub mod orchestrator;
pub mod services;

pub use http::{build_router, run_server, AppState, Db, ServerConfig, ServerError};
pub use orchestrator::{OrchestratorClient, OrchestratorConfig, OrchestratorError};
