//! Parameterized CRUD helpers, error capture and transaction control over a
//! SQLite or MySQL session.
//!
//! ```
//! use recordstore::{params, RecordStore, Value};
//!
//! let mut store = RecordStore::open_sqlite(":memory:");
//! store
//!     .query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", params![])
//!     .unwrap();
//!
//! let id = store.insert_record("users", [("name", "Alice")]).unwrap();
//! let row = store.select_one_record_with_id("users", id).unwrap().unwrap();
//! assert_eq!(row.get("name"), Some(&Value::from("Alice")));
//! ```

// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod store;

pub use crate::core::db::{ConnectionTarget, DatabaseHandle, Row, Statement, Value};
pub use crate::core::{Result, StoreError};
pub use crate::store::{ErrorHook, ExitOnError, RecordOnly, RecordStore, StoreOptions};
