//! Application services on top of the connection set

pub mod replication;
pub mod users;

pub use replication::{ReplicationService, ReplicationStatus};
pub use users::{UserError, UserService};
