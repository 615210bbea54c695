/// MySQL Backend
///
/// `DatabaseHandle` over a single sqlx MySQL connection. The handle owns a
/// current-thread tokio runtime and blocks on it for every call, so callers
/// see the same synchronous interface as the SQLite backend.

use crate::core::db::handle::{DatabaseHandle, Statement};
use crate::core::db::value::Value;
use crate::core::{Result, StoreError};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::types::Decimal;
use sqlx::{Column, ConnectOptions, Connection, Either, MySql, Row, ValueRef};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// A networked MySQL session
pub struct MysqlHandle {
    // Taken and closed on drop, while the runtime is still alive
    conn: Option<MySqlConnection>,
    runtime: Runtime,
    last_insert_id: u64,
}

impl MysqlHandle {
    /// Connects to `database` on `host` (optionally `host:port`).
    pub fn connect(host: &str, database: &str, username: &str, password: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let options = connect_options(host, database, username, password)?;

        debug!("Opening MySQL session to {}/{}", host, database);
        let conn = runtime
            .block_on(options.connect())
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(MysqlHandle {
            conn: Some(conn),
            runtime,
            last_insert_id: 0,
        })
    }
}

impl Drop for MysqlHandle {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("Closing MySQL session");
            if let Err(e) = self.runtime.block_on(conn.close()) {
                debug!("MySQL session did not close cleanly: {}", e);
            }
        }
    }
}

fn connect_options(
    host: &str,
    database: &str,
    username: &str,
    password: &str,
) -> Result<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .database(database)
        .username(username);
    if !password.is_empty() {
        options = options.password(password);
    }

    let options = match host.rsplit_once(':') {
        Some((name, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| StoreError::Connection(format!("invalid port in host '{}'", host)))?;
            options.host(name).port(port)
        }
        None => options.host(host),
    };
    Ok(options)
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(i) => query.bind(*i),
        Value::Real(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Blob(b) => query.bind(b.clone()),
    }
}

/// Decodes one column, trying the Rust types MySQL columns map onto.
fn decode_column(row: &MySqlRow, index: usize) -> std::result::Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Value::Integer(v));
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return Ok(i64::try_from(v)
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(v.to_string())));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Value::Real(v));
    }
    if let Ok(v) = row.try_get::<f32, _>(index) {
        return Ok(Value::Real(f64::from(v)));
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Ok(Value::Text(v));
    }
    if let Ok(v) = row.try_get::<Decimal, _>(index) {
        return Ok(Value::Text(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(index) {
        return Ok(Value::Text(v.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(index) {
        return Ok(Value::Text(v.format("%Y-%m-%d").to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveTime, _>(index) {
        return Ok(Value::Text(v.format("%H:%M:%S").to_string()));
    }
    row.try_get::<Vec<u8>, _>(index).map(Value::Blob)
}

impl DatabaseHandle for MysqlHandle {
    #[allow(deprecated)]
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Statement> {
        let query = params
            .iter()
            .fold(sqlx::query::<MySql>(sql), |query, value| bind_value(query, value));

        let conn = self.conn.as_mut().ok_or(StoreError::NotConnected)?;
        let (rows, rows_affected, last_insert_id) = self.runtime.block_on(async move {
            let mut stream = query.fetch_many(conn);
            let mut rows = Vec::new();
            let mut rows_affected = 0;
            let mut last_insert_id = 0;
            while let Some(step) = stream.try_next().await? {
                match step {
                    Either::Left(done) => {
                        rows_affected += done.rows_affected();
                        last_insert_id = done.last_insert_id();
                    }
                    Either::Right(row) => rows.push(row),
                }
            }
            Ok::<_, sqlx::Error>((rows, rows_affected, last_insert_id))
        })?;
        self.last_insert_id = last_insert_id;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let decoded = (0..row.len())
                .map(|i| decode_column(row, i))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            values.push(decoded);
        }

        Ok(Statement::new(columns, values, rows_affected))
    }

    fn last_insert_id(&mut self) -> Result<String> {
        Ok(self.last_insert_id.to_string())
    }

    fn begin(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(StoreError::NotConnected)?;
        self.runtime
            .block_on(sqlx::raw_sql("START TRANSACTION").execute(conn))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(StoreError::NotConnected)?;
        self.runtime.block_on(sqlx::raw_sql("COMMIT").execute(conn))?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(StoreError::NotConnected)?;
        self.runtime.block_on(sqlx::raw_sql("ROLLBACK").execute(conn))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}
