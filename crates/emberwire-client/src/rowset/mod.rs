//! Row Stream Decoder - Wire Bytes to Typed Rows
//!
//! The decompressed result stream is one header followed by back-to-back
//! rows, with no row count and no row delimiters:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ varint column count                                    │
//! │ column names   (varint length + UTF-8, one per column) │
//! │ declared types (varint length + UTF-8, one per column) │
//! ├────────────────────────────────────────────────────────┤
//! │ row: one cell per column, in header order              │
//! │ row: ...                                               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! [`RowStreamDecoder`] is incremental like the frame decoder: blocks go in
//! via `feed`, complete rows come out via `try_next_row`, and a row that is
//! only partially buffered stays invisible until the rest arrives. Partial
//! parses never consume input; the buffer only advances on a complete
//! header or a complete row, so a retry after more input re-reads from a
//! consistent position.

use bytes::{Buf, BytesMut};
use emberwire_core::varint::{decode_varint_u64, VarintError};
use emberwire_core::{Error, ResolvedType, Result, Value};
use std::sync::Arc;
use tracing::debug;

mod cell;

/// Column counts above this are treated as a corrupt header rather than an
/// allocation request.
const MAX_COLUMNS: usize = 65_536;

/// Internal result type for a partial parse attempt.
///
/// `Incomplete` means the buffered bytes end mid-element; it is a signal to
/// wait, not an error, and must never surface to callers.
#[derive(Debug)]
pub(crate) enum WireError {
    Incomplete,
    Fatal(Error),
}

pub(crate) type WireResult<T> = std::result::Result<T, WireError>;

/// One column of the result set: the name and declared type from the
/// header, plus the parsed form driving cell decode.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared: String,
    pub resolved: ResolvedType,
}

/// One decoded row. Cheap to move; the column metadata is shared.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[ColumnDescriptor]>,
    values: Vec<Value>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Cell by column name, first match in header order.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Consume the row, keeping only the cells.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Incremental decoder from decompressed blocks to [`Row`]s.
pub struct RowStreamDecoder {
    /// Decompressed bytes not yet parsed.
    buf: BytesMut,

    /// Set once the header has been parsed.
    columns: Option<Arc<[ColumnDescriptor]>>,

    /// Stream offset of the start of `buf`, for error context.
    offset: u64,
}

impl RowStreamDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            columns: None,
            offset: 0,
        }
    }

    /// Append a decompressed block.
    pub fn feed(&mut self, block: &[u8]) {
        self.buf.extend_from_slice(block);
    }

    /// Column metadata, if the header has been parsed yet.
    pub fn columns(&self) -> Option<&[ColumnDescriptor]> {
        self.columns.as_deref()
    }

    /// Try to parse the header if it hasn't been parsed, then report the
    /// column metadata. `Ok(None)` means the header needs more input.
    pub fn try_columns(&mut self) -> Result<Option<&[ColumnDescriptor]>> {
        if self.columns.is_none() {
            self.try_parse_header()?;
        }
        Ok(self.columns.as_deref())
    }

    /// Try to decode the next row.
    ///
    /// Returns `Ok(None)` when the buffered bytes end before the row does
    /// (or before the header does); nothing is consumed in that case.
    pub fn try_next_row(&mut self) -> Result<Option<Row>> {
        if self.columns.is_none() {
            self.try_parse_header()?;
        }
        let Some(columns) = self.columns.clone() else {
            return Ok(None);
        };
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut cur: &[u8] = &self.buf;
        let start = cur.len();
        let mut values = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            match cell::decode_value(&mut cur, &column.resolved, index, &column.name) {
                Ok(value) => values.push(value),
                Err(WireError::Incomplete) => return Ok(None),
                Err(WireError::Fatal(e)) => return Err(e),
            }
        }

        let used = start - cur.len();
        self.buf.advance(used);
        self.offset += used as u64;
        Ok(Some(Row { columns, values }))
    }

    /// Validate end-of-input: every fed byte must have been consumed by a
    /// complete header and complete rows.
    pub fn finish(&self) -> Result<()> {
        let end = self.offset + self.buf.len() as u64;
        if self.columns.is_none() {
            return Err(Error::TruncatedStream {
                context: "header",
                offset: end,
            });
        }
        if !self.buf.is_empty() {
            return Err(Error::TruncatedStream {
                context: "row",
                offset: end,
            });
        }
        Ok(())
    }

    fn try_parse_header(&mut self) -> Result<()> {
        let mut cur: &[u8] = &self.buf;
        let start = cur.len();
        match read_header(&mut cur) {
            Ok(columns) => {
                let used = start - cur.len();
                self.buf.advance(used);
                self.offset += used as u64;
                debug!(columns = columns.len(), "parsed result header");
                self.columns = Some(columns.into());
                Ok(())
            }
            Err(WireError::Incomplete) => Ok(()),
            Err(WireError::Fatal(e)) => Err(e),
        }
    }
}

impl Default for RowStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_header(cur: &mut &[u8]) -> WireResult<Vec<ColumnDescriptor>> {
    let count = read_header_varint(cur)? as usize;
    if count == 0 {
        return Err(header_error("header declares zero columns".to_string()));
    }
    if count > MAX_COLUMNS {
        return Err(header_error(format!(
            "header declares {} columns (limit {})",
            count, MAX_COLUMNS
        )));
    }

    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        names.push(read_header_string(cur)?);
    }

    let mut columns = Vec::with_capacity(count);
    for name in names {
        let declared = read_header_string(cur)?;
        let resolved = ResolvedType::parse(&declared).map_err(WireError::Fatal)?;
        columns.push(ColumnDescriptor {
            name,
            declared,
            resolved,
        });
    }
    Ok(columns)
}

fn read_header_varint(cur: &mut &[u8]) -> WireResult<u64> {
    decode_varint_u64(cur).map_err(|e| match e {
        VarintError::Incomplete => WireError::Incomplete,
        VarintError::Overflow => header_error("varint overflow in header".to_string()),
    })
}

fn read_header_string(cur: &mut &[u8]) -> WireResult<String> {
    let len = read_header_varint(cur)? as usize;
    if cur.len() < len {
        return Err(WireError::Incomplete);
    }
    let (head, tail) = cur.split_at(len);
    let text = std::str::from_utf8(head)
        .map_err(|_| header_error("header string is not UTF-8".to_string()))?
        .to_string();
    *cur = tail;
    Ok(text)
}

fn header_error(reason: String) -> WireError {
    WireError::Fatal(Error::MalformedHeader(reason))
}
