//! Structured error types for replidb-core.
//!
//! Uses `thiserror` so callers can match on the failure class (setup,
//! statement, transaction, cancellation, shutdown) instead of strings.
//! Probe failures never appear here: they only downgrade a
//! [`HealthSnapshot`](crate::HealthSnapshot).

use std::fmt;

use thiserror::Error;

use crate::topology::Target;

/// Main error type for replidb-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A node could not be reached at open time (fatal for the primary)
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: Target,
        #[source]
        source: sqlx::Error,
    },

    /// Topology descriptor failed validation
    #[error("invalid topology: {reason}")]
    Topology { reason: String },

    /// A statement failed against the chosen pool
    #[error("statement failed: {0}")]
    Statement(#[from] sqlx::Error),

    /// Beginning or committing a transaction failed
    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    /// Rollback after a failed unit of work also failed
    #[error("{cause}; rollback also failed: {rollback}")]
    Rollback {
        cause: Box<Error>,
        #[source]
        rollback: sqlx::Error,
    },

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// One or more pools could not be released on shutdown
    #[error("failed to release {} connection pool(s): {}", failures.len(), CloseFailures(failures))]
    Close { failures: Vec<CloseFailure> },
}

/// Result type alias for replidb-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a topology validation error
    pub fn topology(reason: impl Into<String>) -> Self {
        Self::Topology {
            reason: reason.into(),
        }
    }

    /// Whether this error is (or wraps) a row-not-found condition
    pub fn is_row_not_found(&self) -> bool {
        match self {
            Self::Statement(sqlx::Error::RowNotFound) => true,
            Self::Rollback { cause, .. } => cause.is_row_not_found(),
            _ => false,
        }
    }

    /// Whether this error came from a fired cancellation token
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Rollback { cause, .. } => cause.is_cancelled(),
            _ => false,
        }
    }

    /// Attach a rollback failure to the error that triggered the rollback
    pub(crate) fn with_rollback_failure(self, rollback: sqlx::Error) -> Self {
        Self::Rollback {
            cause: Box::new(self),
            rollback,
        }
    }
}

/// A pool that failed to release during [`ConnectionSet::close`](crate::ConnectionSet::close)
#[derive(Debug, Clone)]
pub struct CloseFailure {
    pub target: Target,
    pub reason: String,
}

impl fmt::Display for CloseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

struct CloseFailures<'a>(&'a [CloseFailure]);

impl fmt::Display for CloseFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
