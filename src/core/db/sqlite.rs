/// SQLite Backend
///
/// `DatabaseHandle` over a single rusqlite connection.

use crate::core::db::handle::{DatabaseHandle, Statement};
use crate::core::db::value::Value;
use crate::core::{Result, StoreError};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::debug;

/// A file-backed or in-memory SQLite session
#[derive(Debug)]
pub struct SqliteHandle {
    conn: Connection,
}

impl SqliteHandle {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening SQLite database at {:?}", path);
        let conn = Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Wraps an already open connection.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(SqliteHandle { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl DatabaseHandle for SqliteHandle {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Statement> {
        let changes_before = self.conn.total_changes();
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(Value::from(row.get_ref(i)?));
            }
            rows.push(values);
        }
        drop(cursor);
        drop(stmt);

        // changes() still holds the count of the last DML statement run
        let rows_affected = if self.conn.total_changes() > changes_before {
            self.conn.changes()
        } else {
            0
        };
        Ok(Statement::new(columns, rows, rows_affected))
    }

    fn last_insert_id(&mut self) -> Result<String> {
        Ok(self.conn.last_insert_rowid().to_string())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
