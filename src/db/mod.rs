//! Database client layer for hsql.
//!
//! The mapper never talks to sqlx directly. It sees a [`Database`] (plain
//! handle), a [`Transaction`] and the [`RowCursor`] either of them returns,
//! which lets the sqlx-backed clients and the in-memory mocks be used
//! interchangeably.

mod cursor;
mod mock;
mod postgres;
mod sqlite;
mod types;

pub use mock::{FailingDatabase, MockDatabase, MockTransaction, ResultSet};
pub use postgres::{PostgresClient, PostgresTransaction};
pub use sqlite::{SqliteClient, SqliteTransaction};
pub use types::{Row, Value};

use crate::config::ConnectionConfig;
use crate::context::Context;
use crate::error::{HsqlError, Result};
use crate::scan::Scan;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a name or URL scheme.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Creates a database client for the given connection configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn Database>> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(config).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// A plain database handle.
#[async_trait]
pub trait Database: Send + Sync {
    /// Executes `sql` with positional `args` and returns a cursor over the result.
    async fn query<'a>(
        &'a self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>>;

    /// Starts a transaction on a dedicated connection.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// An active transaction.
///
/// Queries borrow the transaction mutably, so at most one cursor is open on
/// it at a time.
#[async_trait]
pub trait Transaction: Send {
    async fn query<'a>(
        &'a mut self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

/// Row-by-row access to a query result.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names of the result, in order.
    async fn columns(&mut self) -> Result<Vec<String>>;

    /// Advances to the next row. `Ok(false)` once the result is exhausted;
    /// a terminal failure of the underlying stream is returned as an error.
    async fn next(&mut self) -> Result<bool>;

    /// Writes the current row into `targets`, which must hold exactly one
    /// target per column.
    fn scan(&mut self, targets: &mut [&mut dyn Scan]) -> Result<()>;

    /// Releases the underlying result stream.
    async fn close(&mut self) -> Result<()>;
}

/// Scans `row` into `targets`, enforcing one target per column.
pub(crate) fn scan_row(
    columns: &[String],
    row: Option<&[Value]>,
    targets: &mut [&mut dyn Scan],
) -> Result<()> {
    let row = row.ok_or_else(|| HsqlError::query("scan called without a current row"))?;

    if targets.len() != columns.len() {
        return Err(HsqlError::ScanArity {
            expected: columns.len(),
            found: targets.len(),
        });
    }

    for ((column, value), target) in columns.iter().zip(row).zip(targets.iter_mut()) {
        target
            .scan(value)
            .map_err(|source| HsqlError::scan(column.as_str(), source))?;
    }

    Ok(())
}
