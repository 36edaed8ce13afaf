//! Streaming result cursor.
//!
//! [`ResultCursor`] glues the pipeline together: it pulls transport chunks
//! from a [`ChunkSource`], runs them through the frame decoder (when the
//! response is compressed) and the row decoder, and hands out one [`Row`]
//! at a time. Nothing is buffered beyond the bytes of the frame and row
//! currently in flight, so result sets larger than memory stream fine.
//!
//! Opening a cursor pumps the source just far enough to parse the header,
//! so column metadata is available before the first row is requested.
//! Dropping the cursor mid-stream drops the source, which for HTTP closes
//! the connection and cancels the query's remaining transfer.

use emberwire_codec::FrameDecoder;
use tracing::debug;

use crate::error::Result;
use crate::rowset::{ColumnDescriptor, Row, RowStreamDecoder};
use crate::source::ChunkSource;

/// Pull-based iterator over the rows of one query result.
pub struct ResultCursor {
    source: Box<dyn ChunkSource>,

    /// Present when the response body is framed; `None` passes chunks
    /// straight to the row decoder.
    frames: Option<FrameDecoder>,

    rows: RowStreamDecoder,
    source_done: bool,
}

impl ResultCursor {
    /// Attach to a raw chunk source and read up to the header.
    ///
    /// This is how `Client::query` builds cursors, and how captured byte
    /// streams can be replayed without a server.
    pub async fn open(source: Box<dyn ChunkSource>, compressed: bool) -> Result<Self> {
        let mut cursor = Self {
            source,
            frames: compressed.then(FrameDecoder::new),
            rows: RowStreamDecoder::new(),
            source_done: false,
        };
        while cursor.rows.try_columns()?.is_none() {
            if !cursor.pump().await? {
                // EOF before the header: check_end reports the truncation.
                cursor.check_end()?;
                break;
            }
        }
        debug!(columns = cursor.columns().len(), "result cursor open");
        Ok(cursor)
    }

    /// Column metadata from the result header.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        self.rows.columns().unwrap_or(&[])
    }

    /// The next row, or `Ok(None)` after the last one.
    ///
    /// End of input is validated: a stream that stops mid-frame or mid-row
    /// is an error, not a short result.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.rows.try_next_row()? {
                return Ok(Some(row));
            }
            if self.source_done || !self.pump().await? {
                self.check_end()?;
                return Ok(None);
            }
        }
    }

    /// Pull one chunk and push it through the decoders. `Ok(false)` at EOF.
    async fn pump(&mut self) -> Result<bool> {
        let Some(chunk) = self.source.next_chunk().await? else {
            self.source_done = true;
            return Ok(false);
        };
        match &mut self.frames {
            Some(frames) => {
                frames.feed(&chunk);
                while let Some(block) = frames.try_next_block()? {
                    self.rows.feed(&block);
                }
            }
            None => self.rows.feed(&chunk),
        }
        Ok(true)
    }

    fn check_end(&self) -> Result<()> {
        if let Some(frames) = &self.frames {
            frames.finish()?;
        }
        self.rows.finish()?;
        Ok(())
    }
}
