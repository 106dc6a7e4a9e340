//! replidb-core: data-access layer over a primary/replica topology
//!
//! - [`ConnectionSet::open`] connects the primary (fatal on failure) and
//!   every reachable replica (failures are warnings)
//! - writes and transactions go to the primary only
//! - reads pick a replica uniformly at random, falling back to the primary
//! - [`ConnectionSet::status`] probes every node and never fails
//!
//! Replication itself is the database engine's job; nothing here promises
//! read-your-writes.

pub mod driver;
pub mod error;
pub mod topology;

mod connection;
mod health;
mod read;
mod write;

pub use connection::ConnectionSet;
pub use driver::Driver;
pub use error::{CloseFailure, Error, Result};
pub use health::HealthSnapshot;
pub use tokio_util::sync::CancellationToken;
pub use topology::{PoolBounds, Target, Topology, CONNECTION_MAX_LIFETIME};
pub use write::WriteOutcome;
