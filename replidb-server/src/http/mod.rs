//! HTTP layer
//!
//! Axum server with:
//! - Request tracing and a per-request timeout
//! - Graceful shutdown that cancels in-flight database calls
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, Db, ServerConfig, ServerError};
