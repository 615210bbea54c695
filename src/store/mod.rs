//! Record store: CRUD helpers over a single database session.
//!
//! Every operation returns a `Result`; the `Err` arm is the failure signal.
//! The error message is also kept in [`RecordStore::last_error`] until the
//! next handle-level call, and handed to the configured [`ErrorHook`].
//!
//! # Trusted identifiers
//!
//! Values are always bound as positional parameters. Table names, column
//! names and where-clauses are NOT: they are concatenated into the SQL text
//! as given. Never pass user-controlled strings in those positions.

pub mod options;
pub mod sql;

pub use options::{ErrorHook, ExitOnError, RecordOnly, StoreOptions, DEFAULT_ID_FIELD};

use crate::config::Config;
use crate::core::db::{connect, ConnectionTarget, DatabaseHandle, Row, Statement, Value};
use crate::core::{Result, StoreError};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

const SET_CHARSET_SQL: &str =
    "SET character_set_client = ?, character_set_connection = ?, character_set_results = ?";

/// Façade over one database session
pub struct RecordStore {
    handle: Option<Box<dyn DatabaseHandle>>,
    id_field_name: String,
    last_error: Option<String>,
    error_hook: Box<dyn ErrorHook>,
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.handle.as_ref().map(|h| h.backend_name()))
            .field("id_field_name", &self.id_field_name)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl RecordStore {
    /// Opens the SQLite database file at `path`.
    pub fn open_sqlite(path: impl AsRef<Path>) -> Self {
        Self::open_sqlite_with(path, StoreOptions::default())
    }

    pub fn open_sqlite_with(path: impl AsRef<Path>, options: StoreOptions) -> Self {
        Self::connect_with(&ConnectionTarget::sqlite(path.as_ref()), "", "", options)
    }

    /// Opens a MySQL session. A non-empty `charset` is applied to the session
    /// right after a successful connect.
    pub fn open_mysql(
        host: &str,
        database: &str,
        username: &str,
        password: &str,
        charset: Option<&str>,
    ) -> Self {
        Self::open_mysql_with(host, database, username, password, charset, StoreOptions::default())
    }

    pub fn open_mysql_with(
        host: &str,
        database: &str,
        username: &str,
        password: &str,
        charset: Option<&str>,
        options: StoreOptions,
    ) -> Self {
        let target = ConnectionTarget::mysql(host, database);
        let mut store = Self::connect_with(&target, username, password, options);
        store.apply_charset(charset);
        store
    }

    /// Connects to `target`.
    ///
    /// A failed connection does not panic: the store is returned without a
    /// handle, `last_error` holds the reason, and every later operation fails
    /// with [`StoreError::NotConnected`].
    pub fn connect(target: &ConnectionTarget, username: &str, password: &str) -> Self {
        Self::connect_with(target, username, password, StoreOptions::default())
    }

    pub fn connect_with(
        target: &ConnectionTarget,
        username: &str,
        password: &str,
        options: StoreOptions,
    ) -> Self {
        let mut store = Self::detached(options);
        match connect(target, username, password) {
            Ok(handle) => {
                info!("Record store connected to {} ({})", target, handle.backend_name());
                store.handle = Some(handle);
            }
            Err(e) => store.record_error(&e),
        }
        store
    }

    /// Wraps an existing session.
    pub fn from_handle(handle: Box<dyn DatabaseHandle>, options: StoreOptions) -> Self {
        let mut store = Self::detached(options);
        store.handle = Some(handle);
        store
    }

    /// Opens the store described by a loaded configuration file.
    pub fn from_config(config: &Config) -> Self {
        let (username, password) = config.credentials();
        let mut store = Self::connect_with(&config.target(), username, password, config.options());
        store.apply_charset(config.charset());
        store
    }

    fn detached(options: StoreOptions) -> Self {
        RecordStore {
            handle: None,
            id_field_name: options.id_field_name,
            last_error: None,
            error_hook: options.error_hook,
        }
    }

    fn apply_charset(&mut self, charset: Option<&str>) {
        let Some(charset) = charset.filter(|c| !c.is_empty()) else {
            return;
        };
        if self.last_error.is_none() {
            let bound = [Value::from(charset), Value::from(charset), Value::from(charset)];
            // A failure is already recorded in last_error
            let _ = self.query(SET_CHARSET_SQL, &bound);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn id_field_name(&self) -> &str {
        &self.id_field_name
    }

    /// Changes the primary-key column used by the `*_with_id` helpers.
    /// An empty name is ignored.
    pub fn set_id_field_name(&mut self, name: &str) {
        if name.is_empty() {
            warn!("Ignoring empty id field name, keeping `{}`", self.id_field_name);
            return;
        }
        self.id_field_name = name.to_string();
    }

    /// Message of the error raised by the most recent handle-level call, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record_error(&mut self, err: &StoreError) {
        let message = err.to_string();
        error!("{}", message);
        self.error_hook.on_error(&message);
        self.last_error = Some(message);
    }

    fn capture<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.record_error(e);
        }
        result
    }

    /// Clears `last_error`, runs `op` against the handle and records its error.
    fn with_handle<T>(
        &mut self,
        op: impl FnOnce(&mut dyn DatabaseHandle) -> Result<T>,
    ) -> Result<T> {
        self.last_error = None;
        let result = match self.handle.as_deref_mut() {
            Some(handle) => op(handle),
            None => Err(StoreError::NotConnected),
        };
        self.capture(result)
    }

    /// Prepares and executes `sql` with `params` bound to its `?` placeholders
    /// in order. The parameter count must match the placeholder count.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Statement> {
        debug!("Executing: {} [{} bound]", sql, params.len());
        self.with_handle(|handle| handle.execute(sql, params))
    }

    /// Runs a statement and returns the number of rows it changed.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        Ok(self.query(sql, params)?.rows_affected())
    }

    /// Inserts one row and returns its generated key.
    ///
    /// The key is returned as the driver reports it, as a string. Columns are
    /// bound in iteration order. Empty `fields` is not special-cased and fails
    /// in the database.
    pub fn insert_record<I, K, V>(&mut self, table: &str, fields: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (columns, values) = split_fields(fields);
        self.query(&sql::insert(table, &columns), &values)?;
        self.with_handle(|handle| handle.last_insert_id())
    }

    /// Updates the rows matching `where_clause`, or every row when it is empty.
    ///
    /// `where_clause` is raw SQL with its own `?` placeholders, bound from
    /// `where_params` after the field values.
    pub fn update_record<I, K, V>(
        &mut self,
        table: &str,
        fields: I,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (columns, mut values) = split_fields(fields);
        values.extend_from_slice(where_params);
        self.query(&sql::update(table, &columns, where_clause), &values)?;
        Ok(())
    }

    pub fn update_record_with_id<I, K, V>(
        &mut self,
        table: &str,
        fields: I,
        id: impl Into<Value>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let condition = sql::id_condition(&self.id_field_name);
        self.update_record(table, fields, &condition, &[id.into()])
    }

    /// Deletes the rows matching `where_clause`, or every row when it is empty.
    pub fn delete_record(
        &mut self,
        table: &str,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<()> {
        self.query(&sql::delete(table, where_clause), where_params)?;
        Ok(())
    }

    pub fn delete_record_with_id(&mut self, table: &str, id: impl Into<Value>) -> Result<()> {
        let condition = sql::id_condition(&self.id_field_name);
        self.delete_record(table, &condition, &[id.into()])
    }

    /// Runs a query and fetches every result row.
    pub fn select_records(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        Ok(self.query(sql, params)?.fetch_all())
    }

    /// Runs a query and fetches its first row.
    ///
    /// `Ok(None)` means the query succeeded and matched nothing.
    pub fn select_one_record(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut stmt = self.query(sql, params)?;
        Ok(stmt.fetch())
    }

    pub fn select_one_record_with_id(
        &mut self,
        table: &str,
        id: impl Into<Value>,
    ) -> Result<Option<Row>> {
        let sql = sql::select_by_id(table, &self.id_field_name);
        self.select_one_record(&sql, &[id.into()])
    }

    /// Counts the rows matching `where_clause`, or all rows when it is empty.
    pub fn row_count(
        &mut self,
        table: &str,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<i64> {
        let row = self.select_one_record(&sql::count(table, where_clause), where_params)?;
        Ok(row
            .as_ref()
            .and_then(|row| row.get("num"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    /// Starts a transaction. Transactions do not nest and are not rolled back
    /// automatically; pair with `end_transaction` or `cancel_transaction`.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.with_handle(|handle| handle.begin())
    }

    /// Commits the current transaction.
    pub fn end_transaction(&mut self) -> Result<()> {
        self.with_handle(|handle| handle.commit())
    }

    /// Rolls back the current transaction.
    pub fn cancel_transaction(&mut self) -> Result<()> {
        self.with_handle(|handle| handle.rollback())
    }
}

fn split_fields<I, K, V>(fields: I) -> (Vec<String>, Vec<Value>)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(column, value)| (column.as_ref().to_string(), value.into()))
        .unzip()
}
