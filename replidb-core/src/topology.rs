//! Topology descriptor - primary/replica addresses and pool sizing
//!
//! Loaded once at startup and never mutated. Field names accept the legacy
//! `master` / `slaves` / `max_conns` spelling so existing YAML keeps working.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Lifetime ceiling applied to every physical connection, primary or replica.
pub const CONNECTION_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Primary + replica addresses and their shared connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    /// Primary node address (required)
    #[serde(alias = "master")]
    pub primary: String,

    /// Replica addresses, in connection order
    #[serde(default, alias = "slaves")]
    pub replicas: Vec<String>,

    pub username: String,
    pub password: String,
    pub database: String,

    /// Maximum open connections per pool
    #[serde(alias = "max_conns")]
    pub max_open: u32,

    /// Maximum idle connections kept warm per pool (clamped to `max_open`)
    pub max_idle: u32,

    /// Upper bound on establishing a connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound on a single health probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// How long `close()` waits for each pool to drain, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

/// Pool sizing applied identically to every node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    pub max_open: u32,
    pub max_idle: u32,
    pub max_lifetime: Duration,
}

impl Topology {
    /// Create a descriptor with default timeouts and no replicas.
    pub fn new(primary: impl Into<String>, max_open: u32, max_idle: u32) -> Self {
        Self {
            primary: primary.into(),
            replicas: Vec::new(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            max_open,
            max_idle,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }

    /// Append a replica address.
    pub fn with_replica(mut self, address: impl Into<String>) -> Self {
        self.replicas.push(address.into());
        self
    }

    /// Set credentials and database name.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self.database = database.into();
        self
    }

    /// Reject descriptors that cannot produce a usable connection set.
    pub fn validate(&self) -> Result<()> {
        if self.primary.trim().is_empty() {
            return Err(Error::topology("primary address is empty"));
        }
        if self.max_open == 0 {
            return Err(Error::topology("max_open must be at least 1"));
        }
        if let Some(index) = self.replicas.iter().position(|r| r.trim().is_empty()) {
            return Err(Error::topology(format!("replica #{index} address is empty")));
        }
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("shutdown_timeout_secs", self.shutdown_timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::topology(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn pool_bounds(&self) -> PoolBounds {
        PoolBounds {
            max_open: self.max_open,
            max_idle: self.max_idle.min(self.max_open),
            max_lifetime: CONNECTION_MAX_LIFETIME,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Identifies one node of the topology in errors and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Primary { address: String },
    Replica { index: usize, address: String },
}

impl Target {
    pub fn address(&self) -> &str {
        match self {
            Self::Primary { address } | Self::Replica { address, .. } => address,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary { .. })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary { address } => write!(f, "primary {address}"),
            Self::Replica { index, address } => write!(f, "replica #{index} {address}"),
        }
    }
}
