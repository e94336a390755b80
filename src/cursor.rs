//! Row-shaping iterator over a streamed query result (spec section 4.8).
//!
//! New relative to the teacher: the teacher has no cursor concept at all
//! (`Client::query`/`query_raw` are the only row-shaping surface). This is
//! grounded directly on spec section 4.8 plus the teacher's `Block`/`RawRow`
//! primitives for row materialization.

use std::{borrow::Cow, collections::VecDeque, pin::Pin};

use futures_util::{Stream, StreamExt};
use indexmap::IndexMap;

use crate::{block::Block, connection::Connection, convert::{RawRow, Row}, KlickhouseError, Result, Type, Value};

/// A dict-shaped row: column name to value. Duplicate column aliases in a
/// `SELECT` follow first-wins semantics — the first column with a given name
/// is kept, later ones with the same name are dropped (spec section 9, open
/// question, resolved as directed).
#[derive(Debug, Clone, Default)]
pub struct DictRow(pub IndexMap<String, Value>);

impl Row for DictRow {
    const COLUMN_COUNT: Option<usize> = None;

    fn deserialize_row(map: Vec<(&str, &Type, Value)>) -> Result<Self> {
        let mut out = IndexMap::new();
        for (name, _type_, value) in map {
            out.entry(name.to_string()).or_insert(value);
        }
        Ok(Self(out))
    }

    fn serialize_row(self, _type_hints: &IndexMap<String, Type>) -> Result<Vec<(Cow<'static, str>, Value)>> {
        Ok(self.0.into_iter().map(|(k, v)| (Cow::Owned(k), v)).collect())
    }
}

/// A row-shaping iterator bound to a [`Connection`] for one query at a time.
/// Closing a cursor does not close its connection: `connection` is a cheap
/// handle clone (the connection's background task and its socket are kept
/// alive by the pool or whoever else holds a clone, not by this cursor).
///
/// Generic over the row shape: `Cursor<RawRow>` (the default) yields
/// positionally-indexable rows, `Cursor<T>` for a `#[derive]`d `Row` yields
/// typed rows, and [`DictCursor`] yields name-keyed rows.
pub struct Cursor<T: Row = RawRow> {
    connection: Connection,
    description: Option<Vec<String>>,
    rowcount: i64,
    arraysize: usize,
    block_stream: Option<Pin<Box<dyn Stream<Item = Result<Block>> + Send>>>,
    row_buffer: VecDeque<T>,
    closed: bool,
}

impl<T: Row> Cursor<T> {
    pub fn new(connection: Connection) -> Self {
        Cursor {
            connection,
            description: None,
            rowcount: -1,
            arraysize: 1,
            block_stream: None,
            row_buffer: VecDeque::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(KlickhouseError::CursorClosed);
        }
        Ok(())
    }

    /// Issues a query. Resets `description`/`rowcount` and any buffered rows
    /// from a prior `execute` on this cursor.
    pub async fn execute(&mut self, query: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.description = None;
        self.rowcount = -1;
        self.row_buffer.clear();
        let stream = self.connection.query_raw(query).await?;
        self.block_stream = Some(Box::pin(stream));
        Ok(())
    }

    /// Inserts a batch of typed rows in one shot. `rowcount` is set to the
    /// number of rows sent.
    pub async fn executemany<I: IntoIterator<Item = T>>(
        &mut self,
        query: impl Into<String>,
        rows: I,
    ) -> Result<()> {
        self.ensure_open()?;
        let rows: Vec<T> = rows.into_iter().collect();
        let count = rows.len() as i64;
        self.connection.insert_native(query, rows).await?;
        self.description = None;
        self.rowcount = count;
        self.block_stream = None;
        self.row_buffer.clear();
        Ok(())
    }

    async fn fill_buffer(&mut self) -> Result<bool> {
        loop {
            if !self.row_buffer.is_empty() {
                return Ok(true);
            }
            let stream = match self.block_stream.as_mut() {
                Some(stream) => stream,
                None => return Ok(false),
            };
            match stream.next().await {
                Some(Ok(mut block)) => {
                    if self.description.is_none() {
                        self.description = Some(block.column_types.keys().cloned().collect());
                    }
                    if block.rows == 0 {
                        continue;
                    }
                    for row_values in block.take_iter_rows() {
                        self.row_buffer.push_back(T::deserialize_row(row_values)?);
                    }
                }
                Some(Err(e)) => {
                    self.block_stream = None;
                    return Err(e);
                }
                None => {
                    self.block_stream = None;
                    return Ok(false);
                }
            }
        }
    }

    /// Returns the next row, or `None` once the result set is exhausted.
    /// Calling `fetchone` after exhaustion keeps returning `None` rather
    /// than looping or erroring.
    pub async fn fetchone(&mut self) -> Result<Option<T>> {
        self.ensure_open()?;
        if !self.fill_buffer().await? {
            return Ok(None);
        }
        let row = self.row_buffer.pop_front();
        if row.is_some() {
            self.rowcount = self.rowcount.max(0) + 1;
        }
        Ok(row)
    }

    /// Returns up to `size` rows; fewer if the result set is exhausted
    /// first.
    pub async fn fetchmany(&mut self, size: usize) -> Result<Vec<T>> {
        self.ensure_open()?;
        let mut out = Vec::with_capacity(size.min(1024));
        while out.len() < size {
            match self.fetchone().await? {
                Some(row) => out.push(row),
                None => break,
            }
        }
        Ok(out)
    }

    /// Drains every remaining row.
    pub async fn fetchall(&mut self) -> Result<Vec<T>> {
        self.ensure_open()?;
        let mut out = Vec::new();
        while let Some(row) = self.fetchone().await? {
            out.push(row);
        }
        Ok(out)
    }

    /// Equivalent to `fetchone`, named for use in a `while let Some(row) =
    /// cursor.next().await?` loop (this crate's stand-in for async
    /// iteration).
    pub async fn next(&mut self) -> Result<Option<T>> {
        self.fetchone().await
    }

    /// Marks the cursor closed. Buffered rows and the underlying block
    /// stream are dropped; the connection is untouched.
    pub fn close(&mut self) {
        self.closed = true;
        self.block_stream = None;
        self.row_buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn description(&self) -> Option<&[String]> {
        self.description.as_deref()
    }

    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize;
    }
}

/// A cursor yielding name-keyed rows. Duplicate column aliases: first-wins
/// (see [`DictRow`]).
pub type DictCursor = Cursor<DictRow>;
