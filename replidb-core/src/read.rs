//! Read routing - uniform random replica per call, primary when there are none
//!
//! Selection is stateless: every call draws a fresh index over the live
//! replica set. No health check gates the pick and a failed read is not
//! retried elsewhere, so a degraded replica surfaces its error directly.
//! Replicas lag the primary; a read issued right after a write may not see it.

use rand::Rng;
use sqlx::query::Query;
use sqlx::{Executor, IntoArguments};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::{cancellable, ConnectionSet, Node};
use crate::driver::Driver;
use crate::error::Result;

impl<DB> ConnectionSet<DB>
where
    DB: Driver,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
{
    /// Run a query on a randomly chosen replica and collect every row.
    pub async fn read<'q, A>(
        &self,
        cancel: &CancellationToken,
        query: Query<'q, DB, A>,
    ) -> Result<Vec<DB::Row>>
    where
        A: 'q + IntoArguments<'q, DB> + Send,
    {
        let node = self.reader();
        debug!(node = %node.target, "routing read");
        cancellable(cancel, query.fetch_all(&node.pool)).await
    }

    /// Like [`read`](Self::read) but expects exactly one row.
    ///
    /// No row is reported as `Error::Statement(sqlx::Error::RowNotFound)`;
    /// check with [`Error::is_row_not_found`](crate::Error::is_row_not_found).
    pub async fn read_one<'q, A>(
        &self,
        cancel: &CancellationToken,
        query: Query<'q, DB, A>,
    ) -> Result<DB::Row>
    where
        A: 'q + IntoArguments<'q, DB> + Send,
    {
        let node = self.reader();
        debug!(node = %node.target, "routing read");
        cancellable(cancel, query.fetch_one(&node.pool)).await
    }

    pub async fn read_optional<'q, A>(
        &self,
        cancel: &CancellationToken,
        query: Query<'q, DB, A>,
    ) -> Result<Option<DB::Row>>
    where
        A: 'q + IntoArguments<'q, DB> + Send,
    {
        let node = self.reader();
        debug!(node = %node.target, "routing read");
        cancellable(cancel, query.fetch_optional(&node.pool)).await
    }

    fn reader(&self) -> &Node<DB> {
        match self.replicas.len() {
            0 => &self.primary,
            n => &self.replicas[rand::thread_rng().gen_range(0..n)],
        }
    }
}
