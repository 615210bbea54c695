/// Database Module
///
/// The database layer underneath the record store, split into:
/// - **Values** (`value.rs`): dynamically typed column values and ordered rows
/// - **Handle** (`handle.rs`): the session capability, executed statements and connection targets
/// - **Backends** (`sqlite.rs`, `mysql.rs`): rusqlite and sqlx implementations of the handle
///
/// ## Error Handling
///
/// All operations report failures as `StoreError`.
pub mod handle;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;
pub mod value;

pub use handle::*;
pub use value::{Row, Value};
