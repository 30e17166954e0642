//! Query executors.
//!
//! Four entry points run a query and map its rows into a caller-supplied
//! destination: [`fetch_one`] and [`fetch_all`] on a plain [`Database`]
//! handle, [`tx_fetch_one`] and [`tx_fetch_all`] inside a [`Transaction`].
//!
//! The destination is validated before any I/O. The cursor is closed once
//! mapping returns, whether it succeeded or not.

use std::fmt;

use crate::context::Context;
use crate::db::{Database, RowCursor, Transaction, Value};
use crate::error::{HsqlError, Result};
use crate::mapper;
use crate::record::Record;
use tracing::{debug, warn};

/// Where fetched records are written.
///
/// `&mut Vec<T>` converts into `Many`, and structs declared with
/// [`record!`](crate::record!) convert from `&mut T` into `One`. Boxed
/// sequences and hand-written records use the variants directly.
#[derive(Debug)]
pub enum Destination<'a, T> {
    /// No destination at all.
    Nil,
    /// A single record.
    One(&'a mut T),
    /// A sequence of records, replaced on success.
    Many(&'a mut Vec<T>),
    /// A sequence of boxed records, replaced on success.
    ManyBoxed(&'a mut Vec<Box<T>>),
}

/// The shape of a [`Destination`], for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Nil,
    Record,
    Sequence,
    BoxedSequence,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Record => "record",
            Self::Sequence => "sequence of records",
            Self::BoxedSequence => "sequence of boxed records",
        }
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a, T> Destination<'a, T> {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Self::Nil => DestinationKind::Nil,
            Self::One(_) => DestinationKind::Record,
            Self::Many(_) => DestinationKind::Sequence,
            Self::ManyBoxed(_) => DestinationKind::BoxedSequence,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    fn into_record(self) -> Result<&'a mut T> {
        match self {
            Self::One(record) => Ok(record),
            Self::Nil => Err(HsqlError::DestinationNil),
            other => Err(invalid(DestinationKind::Record, other.kind())),
        }
    }

    fn into_sequence(self) -> Result<Sequence<'a, T>> {
        match self {
            Self::Many(records) => Ok(Sequence::Plain(records)),
            Self::ManyBoxed(records) => Ok(Sequence::Boxed(records)),
            Self::Nil => Err(HsqlError::DestinationNil),
            Self::One(_) => Err(invalid(DestinationKind::Sequence, DestinationKind::Record)),
        }
    }
}

fn invalid(expected: DestinationKind, found: DestinationKind) -> HsqlError {
    HsqlError::InvalidDestination {
        expected: expected.as_str(),
        found: found.as_str(),
    }
}

impl<'a, T: Record> From<&'a mut Vec<T>> for Destination<'a, T> {
    fn from(records: &'a mut Vec<T>) -> Self {
        Self::Many(records)
    }
}

/// A validated multi-record destination.
enum Sequence<'a, T> {
    Plain(&'a mut Vec<T>),
    Boxed(&'a mut Vec<Box<T>>),
}

impl<T> Sequence<'_, T> {
    fn assign(self, records: Vec<T>) {
        match self {
            Self::Plain(dest) => *dest = records,
            Self::Boxed(dest) => *dest = records.into_iter().map(Box::new).collect(),
        }
    }
}

/// Fetches a single record through a plain database handle.
///
/// Every row is mapped and the first one is stored. With no rows the
/// destination is left untouched and [`HsqlError::NoRows`] is returned.
pub async fn fetch_one<'d, T: Record + 'd>(
    ctx: &Context,
    db: &dyn Database,
    dest: impl Into<Destination<'d, T>>,
    query: &str,
    args: &[Value],
) -> Result<()> {
    let dest = dest.into().into_record()?;
    debug!(query, "fetch_one");

    let cursor = db.query(ctx, query, args).await?;
    store_first(dest, drain(cursor).await?)
}

/// Fetches a single record inside a transaction.
///
/// Behaves like [`fetch_one`].
pub async fn tx_fetch_one<'d, T: Record + 'd>(
    ctx: &Context,
    tx: &mut dyn Transaction,
    dest: impl Into<Destination<'d, T>>,
    query: &str,
    args: &[Value],
) -> Result<()> {
    let dest = dest.into().into_record()?;
    debug!(query, "tx_fetch_one");

    let cursor = tx.query(ctx, query, args).await?;
    store_first(dest, drain(cursor).await?)
}

/// Fetches every row through a plain database handle.
///
/// On success the destination holds exactly the returned rows, in order.
/// An empty result is not an error.
pub async fn fetch_all<'d, T: Record + 'd>(
    ctx: &Context,
    db: &dyn Database,
    dest: impl Into<Destination<'d, T>>,
    query: &str,
    args: &[Value],
) -> Result<()> {
    let dest = dest.into().into_sequence()?;
    debug!(query, "fetch_all");

    let cursor = db.query(ctx, query, args).await?;
    dest.assign(drain(cursor).await?);
    Ok(())
}

/// Fetches every row inside a transaction.
pub async fn tx_fetch_all<'d, T: Record + 'd>(
    ctx: &Context,
    tx: &mut dyn Transaction,
    dest: impl Into<Destination<'d, T>>,
    query: &str,
    args: &[Value],
) -> Result<()> {
    let dest = dest.into().into_sequence()?;
    debug!(query, "tx_fetch_all");

    let cursor = tx.query(ctx, query, args).await?;
    dest.assign(drain(cursor).await?);
    Ok(())
}

/// Maps every row, then closes the cursor. A mapping error wins over a
/// close error.
async fn drain<T: Record>(mut cursor: Box<dyn RowCursor + '_>) -> Result<Vec<T>> {
    let mapped = mapper::scan_all::<T>(cursor.as_mut()).await;
    let closed = cursor.close().await;

    match (mapped, closed) {
        (Ok(records), Ok(())) => Ok(records),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("failed to close cursor after mapping error: {close_err}");
            }
            Err(e)
        }
    }
}

fn store_first<T>(dest: &mut T, records: Vec<T>) -> Result<()> {
    match records.into_iter().next() {
        Some(first) => {
            *dest = first;
            Ok(())
        }
        None => Err(HsqlError::NoRows),
    }
}
