//! Store options and error hooks.

use std::fmt;
use tracing::error;

/// Primary-key column used by the `*_with_id` helpers unless configured otherwise
pub const DEFAULT_ID_FIELD: &str = "id";

/// Called with the message of every error the store records.
pub trait ErrorHook: Send {
    fn on_error(&self, message: &str);
}

impl<F> ErrorHook for F
where
    F: Fn(&str) + Send,
{
    fn on_error(&self, message: &str) {
        self(message)
    }
}

/// Keeps the error in `last_error` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordOnly;

impl ErrorHook for RecordOnly {
    fn on_error(&self, _message: &str) {}
}

/// Prints the message to stderr and terminates the process.
///
/// Meant for short scripts that have no use for recovering from a failed
/// statement.
#[derive(Debug, Clone, Copy)]
pub struct ExitOnError {
    pub code: i32,
}

impl Default for ExitOnError {
    fn default() -> Self {
        ExitOnError { code: 1 }
    }
}

impl ErrorHook for ExitOnError {
    fn on_error(&self, message: &str) {
        error!("Exiting after database error: {}", message);
        eprintln!("{}", message);
        std::process::exit(self.code);
    }
}

/// Construction-time settings for a `RecordStore`
pub struct StoreOptions {
    pub(crate) id_field_name: String,
    pub(crate) error_hook: Box<dyn ErrorHook>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            id_field_name: DEFAULT_ID_FIELD.to_string(),
            error_hook: Box::new(RecordOnly),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("id_field_name", &self.id_field_name)
            .finish_non_exhaustive()
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary-key column for the `*_with_id` helpers. An empty name is ignored.
    pub fn id_field_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.id_field_name = name;
        }
        self
    }

    /// Terminates the process on the first recorded error when enabled.
    pub fn exit_after_error(mut self, enabled: bool) -> Self {
        self.error_hook = if enabled {
            Box::new(ExitOnError::default())
        } else {
            Box::new(RecordOnly)
        };
        self
    }

    pub fn on_error(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.error_hook = Box::new(hook);
        self
    }
}
