//! Mock database clients for testing.
//!
//! Provides in-memory implementations of [`Database`] and [`Transaction`]
//! that replay a canned [`ResultSet`] and count how they were used.

use super::{scan_row, Database, Row, RowCursor, Transaction, Value};
use crate::context::Context;
use crate::error::{HsqlError, Result};
use crate::scan::Scan;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A canned query result.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,

    /// Error reported by the cursor after the last row.
    pub trailing_error: Option<String>,
}

impl ResultSet {
    /// Creates an empty result with the given column names.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Appends a row.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Makes the cursor fail once every row has been read.
    pub fn with_trailing_error(mut self, msg: impl Into<String>) -> Self {
        self.trailing_error = Some(msg.into());
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    queries: AtomicUsize,
    closed_cursors: AtomicUsize,
}

/// A mock database that answers every query with the same result set.
#[derive(Debug, Default)]
pub struct MockDatabase {
    result: ResultSet,
    counters: Arc<Counters>,
}

impl MockDatabase {
    /// Creates a mock database that returns no columns and no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock database returning `result` for every query.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            result,
            counters: Arc::default(),
        }
    }

    /// Number of queries executed so far, transactions included.
    pub fn query_count(&self) -> usize {
        self.counters.queries.load(Ordering::SeqCst)
    }

    /// Number of cursors that have been closed.
    pub fn closed_cursors(&self) -> usize {
        self.counters.closed_cursors.load(Ordering::SeqCst)
    }

    fn open_cursor(&self, ctx: &Context) -> Result<MockCursor> {
        ctx.check()?;
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        Ok(MockCursor::new(self.result.clone(), Arc::clone(&self.counters)))
    }
}

#[async_trait]
impl Database for MockDatabase {
    async fn query<'a>(
        &'a self,
        ctx: &Context,
        _sql: &'a str,
        _args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        Ok(Box::new(self.open_cursor(ctx)?))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(self.transaction()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

impl MockDatabase {
    /// Starts a mock transaction sharing this database's result and counters.
    pub fn transaction(&self) -> MockTransaction {
        MockTransaction {
            db: MockDatabase {
                result: self.result.clone(),
                counters: Arc::clone(&self.counters),
            },
            state: TxState::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// Transaction handle returned by [`MockDatabase`].
#[derive(Debug)]
pub struct MockTransaction {
    db: MockDatabase,
    state: TxState,
}

impl MockTransaction {
    pub fn is_committed(&self) -> bool {
        self.state == TxState::Committed
    }

    pub fn is_rolled_back(&self) -> bool {
        self.state == TxState::RolledBack
    }

    fn finish(&mut self, state: TxState) -> Result<()> {
        if self.state != TxState::Open {
            return Err(HsqlError::query("transaction already finished"));
        }
        self.state = state;
        Ok(())
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn query<'a>(
        &'a mut self,
        ctx: &Context,
        _sql: &'a str,
        _args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        if self.state != TxState::Open {
            return Err(HsqlError::query("transaction already finished"));
        }
        Ok(Box::new(self.db.open_cursor(ctx)?))
    }

    async fn commit(&mut self) -> Result<()> {
        self.finish(TxState::Committed)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.finish(TxState::RolledBack)
    }
}

struct MockCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Row>,
    trailing_error: Option<String>,
    current: Option<Row>,
    counters: Arc<Counters>,
    closed: bool,
}

impl MockCursor {
    fn new(result: ResultSet, counters: Arc<Counters>) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows.into_iter(),
            trailing_error: result.trailing_error,
            current: None,
            counters,
            closed: false,
        }
    }
}

#[async_trait]
impl RowCursor for MockCursor {
    async fn columns(&mut self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    async fn next(&mut self) -> Result<bool> {
        self.current = self.rows.next();
        if self.current.is_some() {
            return Ok(true);
        }
        match self.trailing_error.take() {
            Some(msg) => Err(HsqlError::query(msg)),
            None => Ok(false),
        }
    }

    fn scan(&mut self, targets: &mut [&mut dyn Scan]) -> Result<()> {
        scan_row(&self.columns, self.current.as_deref(), targets)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.closed_cursors.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A database whose every query fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingDatabase {
    message: String,
}

impl FailingDatabase {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Database for FailingDatabase {
    async fn query<'a>(
        &'a self,
        _ctx: &Context,
        _sql: &'a str,
        _args: &'a [Value],
    ) -> Result<Box<dyn RowCursor + 'a>> {
        Err(HsqlError::query(self.message.clone()))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Err(HsqlError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
