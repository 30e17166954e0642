//! PostgreSQL database client implementation.
//!
//! Provides `PostgresClient` and `PostgresTransaction`, which implement the
//! `Database` and `Transaction` traits on top of a sqlx `PgPool`.

use super::cursor::StreamCursor;
use super::{Database, Row, RowCursor, Transaction, Value};
use crate::config::ConnectionConfig;
use crate::context::Context;
use crate::error::{DecodeError, HsqlError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::{debug, trace};

/// PostgreSQL database client.
#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects a new pool using the given configuration.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        debug!("Connecting to {}", config.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        Ok(Self { pool })
    }

    /// Creates a new PostgresClient from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a transaction with a concrete return type.
    pub async fn begin_transaction(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx: Some(tx) })
    }
}

#[async_trait]
impl Database for PostgresClient {
    async fn query<'a>(
        &'a self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        ctx.check()?;
        trace!(args = args.len(), "postgres query: {sql}");

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

/// An open PostgreSQL transaction.
///
/// Dropping it without calling `commit` rolls it back.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn open(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>> {
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
impl Transaction for PostgresTransaction {
    async fn query<'a>(
        &'a mut self,
        ctx: &Context,
        sql: &'a str,
        args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        ctx.check()?;
        trace!(args = args.len(), "postgres tx query: {sql}");

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

/// Binds positional arguments. NULL is sent as a text-typed NULL.
fn bind_args<'q>(sql: &'q str, args: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
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

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Types without a dedicated variant are carried as their text form:
/// NUMERIC, UUID, DATE, TIME, JSON and INTERVAL explicitly, anything else when
/// sqlx can decode it as a string. A type that cannot be read at all is a
/// scan error naming the column.
fn convert_value(row: &PgRow, index: usize, column: &str, type_name: &str) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "INT2" | "SMALLINT" => Value::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" | "INT" | "INTEGER" => Value::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" | "BIGINT" => Value::Int(row.try_get(index)?),
        "OID" => Value::Int(row.try_get::<Oid, _>(index)?.0.into()),
        "FLOAT4" | "REAL" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" | "DOUBLE PRECISION" => Value::Float(row.try_get(index)?),
        "BYTEA" => Value::Bytes(row.try_get(index)?),
        "TIMESTAMPTZ" => Value::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?),
        "TIMESTAMP" => Value::from(row.try_get::<NaiveDateTime, _>(index)?),
        "NUMERIC" => Value::String(row.try_get::<BigDecimal, _>(index)?.to_string()),
        "UUID" => Value::String(row.try_get::<Uuid, _>(index)?.to_string()),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "JSON" | "JSONB" => Value::String(row.try_get::<JsonValue, _>(index)?.to_string()),
        "INTERVAL" => Value::String(format_interval(&row.try_get::<PgInterval, _>(index)?)),
        _ => match row.try_get::<String, _>(index) {
            Ok(s) => Value::String(s),
            Err(e) => {
                trace!("column {column} of type {type_name} is not readable as text: {e}");
                return Err(HsqlError::scan(
                    column,
                    DecodeError::UnsupportedType {
                        type_name: type_name.to_string(),
                    },
                ));
            }
        },
    };

    Ok(value)
}

/// Formats an interval as an ISO 8601 duration, e.g. `P1M2DT3.5S`.
fn format_interval(interval: &PgInterval) -> String {
    let mut out = String::from("P");
    if interval.months != 0 {
        out.push_str(&format!("{}M", interval.months));
    }
    if interval.days != 0 {
        out.push_str(&format!("{}D", interval.days));
    }
    if interval.microseconds != 0 || out.len() == 1 {
        let secs = interval.microseconds / 1_000_000;
        let micros = (interval.microseconds % 1_000_000).abs();
        let sign = if interval.microseconds < 0 && secs == 0 { "-" } else { "" };
        if micros == 0 {
            out.push_str(&format!("T{sign}{secs}S"));
        } else {
            let frac = format!("{micros:06}");
            out.push_str(&format!("T{sign}{secs}.{}S", frac.trim_end_matches('0')));
        }
    }
    out
}

/// Maps sqlx connection errors to messages that do not leak the password.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> HsqlError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        HsqlError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        HsqlError::connection(format!(
            "Authentication failed for {target}. Check your credentials."
        ))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        HsqlError::connection(format!("Connection to {target} timed out."))
    } else {
        HsqlError::connection(error.to_string())
    }
}
