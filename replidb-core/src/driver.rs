//! Driver seam between the connection set and a concrete sqlx backend
//!
//! MySQL is the production engine. SQLite treats each address as a database
//! file, which makes every node an independent store; tests rely on that to
//! observe routing directly.

use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlQueryResult};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteQueryResult};
use sqlx::{Connection, Database};

use crate::error::{Error, Result};
use crate::topology::Topology;

/// Connect options type for a backend's connection.
pub type ConnectOptions<DB> = <<DB as Database>::Connection as Connection>::Options;

const MYSQL_DEFAULT_PORT: u16 = 3306;

/// A sqlx backend the connection set can open pools against.
pub trait Driver: Database {
    /// Build connect options for one node from the shared topology parameters.
    fn connect_options(topology: &Topology, address: &str) -> Result<ConnectOptions<Self>>;

    /// Identifier generated by the last INSERT of a write.
    ///
    /// Fails with a decode error when the engine reports an id that does not
    /// fit in an `i64`.
    fn last_insert_id(result: &Self::QueryResult) -> Result<i64>;

    fn rows_affected(result: &Self::QueryResult) -> u64;
}

impl Driver for MySql {
    fn connect_options(topology: &Topology, address: &str) -> Result<MySqlConnectOptions> {
        let (host, port) = split_host_port(address)?;
        Ok(MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&topology.username)
            .password(&topology.password)
            .database(&topology.database))
    }

    fn last_insert_id(result: &MySqlQueryResult) -> Result<i64> {
        signed_insert_id(result.last_insert_id())
    }

    fn rows_affected(result: &MySqlQueryResult) -> u64 {
        result.rows_affected()
    }
}

impl Driver for Sqlite {
    fn connect_options(topology: &Topology, address: &str) -> Result<SqliteConnectOptions> {
        Ok(SqliteConnectOptions::new()
            .filename(address)
            .create_if_missing(true)
            .busy_timeout(topology.connect_timeout()))
    }

    fn last_insert_id(result: &SqliteQueryResult) -> Result<i64> {
        Ok(result.last_insert_rowid())
    }

    fn rows_affected(result: &SqliteQueryResult) -> u64 {
        result.rows_affected()
    }
}

/// Split `host[:port]`, defaulting to the MySQL port. IPv6 hosts use brackets.
fn split_host_port(address: &str) -> Result<(&str, u16)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::topology(format!("unterminated IPv6 host in '{address}'")))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_port(address, port)?,
            None if tail.is_empty() => MYSQL_DEFAULT_PORT,
            None => return Err(Error::topology(format!("invalid address '{address}'"))),
        };
        return Ok((host, port));
    }

    match address.rsplit_once(':') {
        Some((host, port)) => Ok((host, parse_port(address, port)?)),
        None => Ok((address, MYSQL_DEFAULT_PORT)),
    }
}

/// MySQL reports ids as unsigned; a `BIGINT UNSIGNED` column can exceed `i64`.
fn signed_insert_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|e| Error::Statement(sqlx::Error::Decode(Box::new(e))))
}

fn parse_port(address: &str, port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| Error::topology(format!("invalid port in address '{address}'")))
}
