//! Route handlers organized by resource

pub mod health;
pub mod replication;
pub mod users;

use std::sync::Arc;

use axum::Router;

use super::server::AppState;

/// Everything served under `/api`
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(users::router())
        .merge(replication::router())
}
