/// Store Error Module
///
/// This module defines the error type shared by the database backends and
/// the record store. Errors never escape as panics: the store records their
/// message and hands them back as the `Err` arm of a `Result`.
use thiserror::Error;

/// Error type for every fallible record store operation.
///
/// This enum covers:
/// - Connection setup (unreachable server, unopenable file, missing backend)
/// - Statement failures reported by SQLite or the networked driver
/// - Operations attempted on a store whose connection never opened
/// - Configuration loading
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors reported by SQLite (prepare, bind, step, transaction control)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors reported by the networked database driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// The store holds no live connection handle
    #[error("No database connection")]
    NotConnected,

    /// Configuration parsing and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Driver(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

/// Type alias for Result using `StoreError` as the error type.
pub type Result<T> = std::result::Result<T, StoreError>;
