//! Error types for rowcast
//!
//! Error codes:
//! - ROWCAST_CONFIGURATION: structurally invalid mapping or unresolvable shape
//! - ROWCAST_COLUMN_BINDING: a column value could not be converted into its field
//! - ROWCAST_CAST: SQL NULL reached a non-nullable value-type field
//! - ROWCAST_NOT_FOUND: a required column is missing from the row shape
//! - ROWCAST_ROW_SOURCE: the row source failed while advancing or reading
//! - ROWCAST_EXECUTION: the command executor failed
//! - ROWCAST_CANCELLED: async execution cancelled before materialization
//! - ROWCAST_INTERNAL: lock poisoning or broken internal invariant

use thiserror::Error;

use crate::source::RowSourceError;

/// Boxed error used as the cause of binding and execution failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for rowcast operations
pub type MapResult<T> = Result<T, MapError>;

/// Failure converting a single SQL value into a Rust value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("cannot convert {found} to {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },

    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    /// Shorthand for a custom conversion failure
    pub fn custom(message: impl Into<String>) -> Self {
        ConversionError::Custom(message.into())
    }
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum MapError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("column binding failed for field '{field}' (alias '{alias}', type {dest_type}): {source}")]
    ColumnBinding {
        field: String,
        alias: String,
        dest_type: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("cannot assign NULL from column '{alias}' to non-nullable field '{field}' of type {dest_type}")]
    Cast {
        field: String,
        alias: String,
        dest_type: &'static str,
    },

    #[error("required column '{alias}' for field '{field}' not found")]
    NotFound { field: String, alias: String },

    #[error("row source error: {0}")]
    RowSource(#[from] RowSourceError),

    #[error("execution failed: {0}")]
    Execution(#[source] BoxError),

    #[error("execution cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl MapError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        MapError::Configuration(reason.into())
    }

    /// Wrap an executor failure
    pub fn execution(source: impl Into<BoxError>) -> Self {
        MapError::Execution(source.into())
    }

    /// Error raised when a shared lock was poisoned by a panicking holder
    pub(crate) fn poisoned(what: &str) -> Self {
        MapError::Internal(format!("{} lock poisoned", what))
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            MapError::Configuration(_) => "ROWCAST_CONFIGURATION",
            MapError::ColumnBinding { .. } => "ROWCAST_COLUMN_BINDING",
            MapError::Cast { .. } => "ROWCAST_CAST",
            MapError::NotFound { .. } => "ROWCAST_NOT_FOUND",
            MapError::RowSource(_) => "ROWCAST_ROW_SOURCE",
            MapError::Execution(_) => "ROWCAST_EXECUTION",
            MapError::Cancelled => "ROWCAST_CANCELLED",
            MapError::Internal(_) => "ROWCAST_INTERNAL",
        }
    }

    /// Fatal errors leave shared state unusable (a poisoned lock)
    pub fn is_fatal(&self) -> bool {
        matches!(self, MapError::Internal(_))
    }

    /// Returns true for errors detected before any row was read
    pub fn is_configuration(&self) -> bool {
        matches!(self, MapError::Configuration(_))
    }

    /// Returns the (field, alias) pair for per-field materialization errors
    pub fn field_context(&self) -> Option<(&str, &str)> {
        match self {
            MapError::ColumnBinding { field, alias, .. }
            | MapError::Cast { field, alias, .. }
            | MapError::NotFound { field, alias } => Some((field, alias)),
            _ => None,
        }
    }
}
