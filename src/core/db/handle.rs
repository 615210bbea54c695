/// Database Handle Module
///
/// The capability the record store is built on: something that can run a
/// parameterized statement, report the last generated key and drive a
/// transaction. SQLite and MySQL sessions implement it; tests can supply
/// their own.

use crate::core::db::value::{Row, Value};
use crate::core::Result;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// A live database session
pub trait DatabaseHandle: Send {
    /// Prepares `sql`, binds `params` positionally and executes it.
    ///
    /// The parameter count must match the statement's placeholder count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Statement>;

    /// Key generated by the most recent successful insert on this session.
    fn last_insert_id(&mut self) -> Result<String>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Short backend name used in log output
    fn backend_name(&self) -> &'static str;
}

/// An executed statement and its result set
///
/// Rows are read from the driver during execution, so fetching never fails.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    rows_affected: u64,
}

impl Statement {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, rows_affected: u64) -> Self {
        Statement {
            columns,
            rows: rows.into(),
            rows_affected,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows changed by an INSERT, UPDATE or DELETE
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Rows not yet fetched
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Fetches the next row, or `None` once the result set is exhausted.
    pub fn fetch(&mut self) -> Option<Row> {
        let values = self.rows.pop_front()?;
        Some(self.columns.iter().cloned().zip(values).collect())
    }

    /// Fetches every remaining row in result-set order.
    pub fn fetch_all(mut self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.rows.len());
        while let Some(row) = self.fetch() {
            rows.push(row);
        }
        rows
    }
}

/// Where a store connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// File-backed SQLite database; `:memory:` opens a private in-memory one
    Sqlite { path: PathBuf },
    /// Networked MySQL database. `host` may carry a `:port` suffix.
    Mysql { host: String, database: String },
}

impl ConnectionTarget {
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        ConnectionTarget::Sqlite { path: path.into() }
    }

    pub fn mysql(host: impl Into<String>, database: impl Into<String>) -> Self {
        ConnectionTarget::Mysql {
            host: host.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::Sqlite { path } => write!(f, "sqlite:{}", path.display()),
            ConnectionTarget::Mysql { host, database } => {
                write!(f, "mysql:host={};dbname={}", host, database)
            }
        }
    }
}

/// Opens a session to `target`.
///
/// SQLite ignores the credentials.
pub fn connect(
    target: &ConnectionTarget,
    username: &str,
    password: &str,
) -> Result<Box<dyn DatabaseHandle>> {
    info!("Connecting to {}", target);
    match target {
        ConnectionTarget::Sqlite { path } => {
            Ok(Box::new(super::sqlite::SqliteHandle::open(path)?))
        }
        ConnectionTarget::Mysql { host, database } => {
            connect_mysql(host, database, username, password)
        }
    }
}

#[cfg(feature = "mysql")]
fn connect_mysql(
    host: &str,
    database: &str,
    username: &str,
    password: &str,
) -> Result<Box<dyn DatabaseHandle>> {
    Ok(Box::new(super::mysql::MysqlHandle::connect(
        host, database, username, password,
    )?))
}

#[cfg(not(feature = "mysql"))]
fn connect_mysql(
    _host: &str,
    _database: &str,
    _username: &str,
    _password: &str,
) -> Result<Box<dyn DatabaseHandle>> {
    Err(crate::core::StoreError::Connection(
        "unsupported backend: mysql (built without the `mysql` feature)".to_string(),
    ))
}
