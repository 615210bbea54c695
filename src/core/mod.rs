/// Core Module
///
/// Shared infrastructure for the record store: the error type and the
/// database layer (values, rows, the handle capability and its backends).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
