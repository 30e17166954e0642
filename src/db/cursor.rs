//! Cursor over a sqlx row stream.
//!
//! sqlx only exposes column metadata on fetched rows, so the first row is
//! peeked when column names are requested before iteration starts. An empty
//! result therefore reports no columns.

use super::{scan_row, Row, RowCursor};
use crate::context::Context;
use crate::error::{HsqlError, Result};
use crate::scan::Scan;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::Column;
use tracing::trace;

/// Converts a backend row into raw values.
pub(crate) type RowConverter<R> = fn(&R) -> Result<Row>;

pub(crate) struct StreamCursor<'a, R> {
    ctx: Context,
    stream: Option<BoxStream<'a, std::result::Result<R, sqlx::Error>>>,
    convert: RowConverter<R>,
    peeked: Option<R>,
    columns: Option<Vec<String>>,
    current: Option<Row>,
    rows_read: usize,
}

impl<'a, R: sqlx::Row> StreamCursor<'a, R> {
    pub(crate) fn new(
        ctx: &Context,
        stream: BoxStream<'a, std::result::Result<R, sqlx::Error>>,
        convert: RowConverter<R>,
    ) -> Self {
        Self {
            ctx: ctx.clone(),
            stream: Some(stream),
            convert,
            peeked: None,
            columns: None,
            current: None,
            rows_read: 0,
        }
    }

    async fn fetch(&mut self) -> Result<Option<R>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        self.ctx
            .run(async move { stream.try_next().await.map_err(HsqlError::from) })
            .await
    }
}

fn column_names<R: sqlx::Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

#[async_trait]
impl<'a, R: sqlx::Row> RowCursor for StreamCursor<'a, R> {
    async fn columns(&mut self) -> Result<Vec<String>> {
        if self.columns.is_none() {
            let first = self.fetch().await?;
            self.columns = Some(first.as_ref().map(column_names).unwrap_or_default());
            self.peeked = first;
        }
        Ok(self.columns.clone().unwrap_or_default())
    }

    async fn next(&mut self) -> Result<bool> {
        let row = match self.peeked.take() {
            Some(row) => Some(row),
            None => self.fetch().await?,
        };

        match row {
            Some(row) => {
                if self.columns.is_none() {
                    self.columns = Some(column_names(&row));
                }
                self.current = Some((self.convert)(&row)?);
                self.rows_read += 1;
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn scan(&mut self, targets: &mut [&mut dyn Scan]) -> Result<()> {
        let columns = self.columns.as_deref().unwrap_or(&[]);
        scan_row(columns, self.current.as_deref(), targets)
    }

    async fn close(&mut self) -> Result<()> {
        trace!(rows = self.rows_read, "closing row stream");
        self.stream = None;
        self.peeked = None;
        self.current = None;
        Ok(())
    }
}
