//! SQLite database client implementation.
//!
//! Provides `SqliteClient` and `SqliteTransaction` on top of a sqlx
//! `SqlitePool`. Values are converted by their runtime storage class, since
//! SQLite column declarations are only affinities.

use super::cursor::StreamCursor;
use super::{Database, Row, RowCursor, Transaction, Value};
use crate::config::ConnectionConfig;
use crate::context::Context;
use crate::error::{DecodeError, HsqlError, Result};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as SqlxRow, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, trace};

/// SQLite database client.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a pool using the given configuration.
    ///
    /// In-memory databases are private to a connection, so their pool is
    /// pinned to a single connection that is never recycled.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        debug!("Opening {}", config.display_string());

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout());

        if config.url.contains(":memory:") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect(&config.url)
            .await
            .map_err(|e| HsqlError::connection(format!("{}: {e}", config.display_string())))?;

        Ok(Self { pool })
    }

    /// Creates a new SqliteClient from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for statements outside the mapper (DDL, inserts).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction with a concrete return type.
    pub async fn begin_transaction(&self) -> Result<SqliteTransaction> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction { tx: Some(tx) })
    }
}

#[async_trait]
impl Database for SqliteClient {
    async fn query<'a>(
        &'a self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        ctx.check()?;
        trace!(args = args.len(), "sqlite query: {sql}");

        let stream = bind_args(sql, args).fetch(&self.pool);
        Ok(Box::new(StreamCursor::new(ctx, stream, convert_row)))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(self.begin_transaction().await?))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// An open SQLite transaction.
///
/// Dropping it without calling `commit` rolls it back.
#[derive(Debug)]
pub struct SqliteTransaction {
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn open(&mut self) -> Result<&mut sqlx::Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| HsqlError::query("transaction already finished"))
    }

    /// Executes a statement that returns no rows inside the transaction.
    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        let tx = self.open()?;
        let done = bind_args(sql, args).execute(&mut **tx).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn query<'a>(
        &'a mut self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        ctx.check()?;
        trace!(args = args.len(), "sqlite tx query: {sql}");

        let tx = self.open()?;
        let stream = bind_args(sql, args).fetch(&mut **tx);
        Ok(Box::new(StreamCursor::new(ctx, stream, convert_row)))
    }

    async fn commit(&mut self) -> Result<()> {
        self.open()?;
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.open()?;
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

fn bind_args<'q>(sql: &'q str, args: &'q [Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    args.iter().fold(sqlx::query(sql), |query, arg| match arg {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.as_str()),
        Value::Bytes(b) => query.bind(b.as_slice()),
        Value::Timestamp(t) => query.bind(*t),
    })
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name()))
        .collect()
}

/// Converts one column by the storage class of the stored value.
fn convert_value(row: &SqliteRow, index: usize, column: &str) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_uppercase();

    let value = match storage.as_str() {
        "INTEGER" => Value::Int(row.try_get(index)?),
        "REAL" => Value::Float(row.try_get(index)?),
        "BLOB" => Value::Bytes(row.try_get(index)?),
        _ => match row.try_get::<String, _>(index) {
            Ok(s) => Value::String(s),
            Err(e) => {
                trace!("column {column} with storage {storage} is not readable as text: {e}");
                return Err(HsqlError::scan(
                    column,
                    DecodeError::UnsupportedType {
                        type_name: storage.clone(),
                    },
                ));
            }
        },
    };

    Ok(value)
}
