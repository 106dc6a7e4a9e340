//! User service - writes on the primary, reads from replicas
//!
//! `create` reads its own row back through the read path, so on a lagging
//! replica the freshly inserted user may not be visible yet.

use std::sync::Arc;

use replidb_core::{CancellationToken, ConnectionSet, Driver};
use sqlx::{Encode, Executor, FromRow, IntoArguments, Type};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{NewUser, User, ValidationError};

const SELECT_USER: &str = "SELECT id, name, email, created_at FROM users WHERE id = ?";
const LIST_USERS: &str = "SELECT id, name, email, created_at FROM users ORDER BY id DESC";
const INSERT_USER: &str = "INSERT INTO users (name, email) VALUES (?, ?)";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid user: {0}")]
    Validation(#[from] ValidationError),

    #[error("user {id} not found")]
    NotFound { id: i64 },

    #[error(transparent)]
    Database(#[from] replidb_core::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;

pub struct UserService<DB: sqlx::Database> {
    db: Arc<ConnectionSet<DB>>,
}

impl<DB: sqlx::Database> Clone for UserService<DB> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<DB> UserService<DB>
where
    DB: Driver,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    for<'q> String: Encode<'q, DB>,
    String: Type<DB>,
    for<'q> i64: Encode<'q, DB>,
    i64: Type<DB>,
    for<'r> User: FromRow<'r, DB::Row>,
{
    pub fn new(db: Arc<ConnectionSet<DB>>) -> Self {
        Self { db }
    }

    /// Insert on the primary, then fetch the row back from a replica.
    pub async fn create(&self, cancel: &CancellationToken, user: NewUser) -> Result<User> {
        let (name, email) = user.into_parts();
        let outcome = self
            .db
            .write(cancel, sqlx::query(INSERT_USER).bind(name).bind(email))
            .await?;

        debug!(id = outcome.last_insert_id, "user inserted");
        self.get(cancel, outcome.last_insert_id).await
    }

    pub async fn get(&self, cancel: &CancellationToken, id: i64) -> Result<User> {
        let row = self
            .db
            .read_optional(cancel, sqlx::query(SELECT_USER).bind(id))
            .await?
            .ok_or(UserError::NotFound { id })?;

        User::from_row(&row).map_err(|e| UserError::Database(e.into()))
    }

    /// Every user, newest first. Rows that fail to decode are skipped.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<User>> {
        let rows = self.db.read(cancel, sqlx::query(LIST_USERS)).await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            match User::from_row(row) {
                Ok(user) => users.push(user),
                Err(e) => warn!(error = %e, "skipping undecodable user row"),
            }
        }
        Ok(users)
    }

    /// Insert every user in one transaction; either all land or none do.
    pub async fn create_batch(
        &self,
        cancel: &CancellationToken,
        users: Vec<NewUser>,
    ) -> Result<Vec<User>> {
        if users.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let created = self
            .db
            .write_transactional(cancel, move |tx| {
                Box::pin(async move {
                    let mut created = Vec::with_capacity(users.len());
                    for user in users {
                        let (name, email) = user.into_parts();
                        let result = sqlx::query(INSERT_USER)
                            .bind(name)
                            .bind(email)
                            .execute(&mut **tx)
                            .await?;

                        let user = sqlx::query_as::<DB, User>(SELECT_USER)
                            .bind(DB::last_insert_id(&result)?)
                            .fetch_one(&mut **tx)
                            .await?;
                        created.push(user);
                    }
                    Ok::<_, replidb_core::Error>(created)
                })
            })
            .await?;

        debug!(count = created.len(), "user batch committed");
        Ok(created)
    }
}
