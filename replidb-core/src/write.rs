//! Write routing - every write and transaction goes to the primary
//!
//! No retries. A failing statement is returned to the caller as-is.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::query::Query;
use sqlx::{Database, Executor, IntoArguments, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::connection::{cancellable, ConnectionSet};
use crate::driver::Driver;
use crate::error::{Error, Result};

/// What a write statement changed on the primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub rows_affected: u64,
    /// Id generated by an INSERT (0 when the statement generated none)
    pub last_insert_id: i64,
}

enum Resolution<T> {
    Completed(T),
    Failed(Error),
    Cancelled,
    Panicked(Box<dyn Any + Send>),
}

impl<DB> ConnectionSet<DB>
where
    DB: Driver,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
{
    /// Execute a statement on the primary.
    ///
    /// ```ignore
    /// let outcome = db
    ///     .write(&cancel, sqlx::query("INSERT INTO users (name, email) VALUES (?, ?)")
    ///         .bind(name)
    ///         .bind(email))
    ///     .await?;
    /// ```
    pub async fn write<'q, A>(
        &self,
        cancel: &CancellationToken,
        statement: Query<'q, DB, A>,
    ) -> Result<WriteOutcome>
    where
        A: 'q + IntoArguments<'q, DB> + Send,
    {
        debug!(node = %self.primary.target, "routing write");
        let result = cancellable(cancel, statement.execute(&self.primary.pool)).await?;

        Ok(WriteOutcome {
            rows_affected: DB::rows_affected(&result),
            last_insert_id: DB::last_insert_id(&result)?,
        })
    }

    /// Run `unit_of_work` inside a transaction on the primary.
    ///
    /// The transaction commits when the unit of work returns `Ok`. It rolls
    /// back when the unit of work returns `Err`, when `cancel` fires, or when
    /// the unit of work panics; in the panic case the panic resumes after the
    /// rollback. Exactly one of commit or rollback runs on every path.
    ///
    /// ```ignore
    /// db.write_transactional(&cancel, |tx| {
    ///     Box::pin(async move {
    ///         sqlx::query("UPDATE accounts SET balance = balance - 10 WHERE id = 1")
    ///             .execute(&mut **tx)
    ///             .await?;
    ///         sqlx::query("UPDATE accounts SET balance = balance + 10 WHERE id = 2")
    ///             .execute(&mut **tx)
    ///             .await?;
    ///         Ok::<_, replidb_core::Error>(())
    ///     })
    /// })
    /// .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::Transaction`] if the transaction cannot begin or commit
    /// - the unit of work's own error after a successful rollback
    /// - [`Error::Cancelled`] after a successful rollback
    /// - [`Error::Rollback`] wrapping either of the above when rollback fails
    ///
    /// # Panics
    ///
    /// Resumes the unit of work's panic after rolling back. If that rollback
    /// also fails, the rollback error is logged at `error` level and is not
    /// returned; only the panic payload reaches the caller.
    pub async fn write_transactional<T, F>(
        &self,
        cancel: &CancellationToken,
        unit_of_work: F,
    ) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut Transaction<'static, DB>) -> BoxFuture<'t, Result<T>>,
    {
        let mut tx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            tx = self.primary.pool.begin() => tx.map_err(Error::Transaction)?,
        };
        debug!(node = %self.primary.target, "transaction started");

        let resolution = {
            let work = AssertUnwindSafe(unit_of_work(&mut tx)).catch_unwind();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Resolution::Cancelled,
                outcome = work => match outcome {
                    Ok(Ok(value)) => Resolution::Completed(value),
                    Ok(Err(e)) => Resolution::Failed(e),
                    Err(payload) => Resolution::Panicked(payload),
                },
            }
        };

        match resolution {
            Resolution::Completed(value) => {
                tx.commit().await.map_err(Error::Transaction)?;
                debug!("transaction committed");
                Ok(value)
            }
            Resolution::Failed(e) => Err(roll_back(tx, e).await),
            Resolution::Cancelled => Err(roll_back(tx, Error::Cancelled).await),
            Resolution::Panicked(payload) => {
                if let Err(e) = tx.rollback().await {
                    error!(error = %e, "rollback after panic in unit of work failed");
                } else {
                    debug!("transaction rolled back after panic");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

async fn roll_back<DB: Database>(tx: Transaction<'static, DB>, cause: Error) -> Error {
    match tx.rollback().await {
        Ok(()) => {
            debug!(cause = %cause, "transaction rolled back");
            cause
        }
        Err(e) => {
            error!(cause = %cause, error = %e, "rollback failed");
            cause.with_rollback_failure(e)
        }
    }
}
