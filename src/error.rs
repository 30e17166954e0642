//! Error types for hsql.
//!
//! Defines the main error enum returned by the executors and the mapper, and
//! the narrower [`DecodeError`] produced when a raw column value cannot be
//! converted into a record field.

use thiserror::Error;

/// Main error type for hsql operations.
#[derive(Error, Debug)]
pub enum HsqlError {
    /// The caller passed a nil destination.
    #[error("destination is nil")]
    DestinationNil,

    /// The destination does not have the shape the entry point requires.
    #[error("destination is invalid(expected {expected}, found {found})")]
    InvalidDestination {
        expected: &'static str,
        found: &'static str,
    },

    /// A single-record fetch matched no rows.
    #[error("no rows in result set")]
    NoRows,

    /// Failure reported by sqlx, surfaced unchanged.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Query execution failure reported by a non-sqlx client.
    #[error("Query error: {0}")]
    Query(String),

    /// A column value could not be stored into its bound field.
    #[error("cannot scan column \"{column}\": {source}")]
    Scan {
        column: String,
        #[source]
        source: DecodeError,
    },

    /// The number of scan targets does not match the number of columns.
    #[error("expected {expected} scan targets, got {found}")]
    ScanArity { expected: usize, found: usize },

    /// The execution context was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// The execution context deadline elapsed.
    #[error("query timed out")]
    Timeout,

    /// Database connection errors (bad URL, host unreachable, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HsqlError {
    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a scan error for the given column.
    pub fn scan(column: impl Into<String>, source: DecodeError) -> Self {
        Self::Scan {
            column: column.into(),
            source,
        }
    }

    /// Returns true for the "no rows" condition of single-record fetches.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DestinationNil | Self::InvalidDestination { .. } => "Destination Error",
            Self::NoRows => "No Rows",
            Self::Database(_) | Self::Query(_) => "Query Error",
            Self::Scan { .. } | Self::ScanArity { .. } => "Scan Error",
            Self::Cancelled | Self::Timeout => "Cancelled",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Failure converting a raw column value into a field type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unexpected NULL for non-optional {expected}")]
    UnexpectedNull { expected: &'static str },

    #[error("cannot convert {found} into {expected}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },

    #[error("cannot parse {expected} from {input:?}")]
    Parse { expected: &'static str, input: String },

    /// The client has no conversion for the column's database type.
    #[error("unsupported column type {type_name}")]
    UnsupportedType { type_name: String },
}

/// Result type alias using HsqlError.
pub type Result<T> = std::result::Result<T, HsqlError>;
