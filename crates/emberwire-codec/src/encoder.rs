//! Frame Encoder - Compressing the Upload Transport
//!
//! [`encode_block`] turns one block of bytes into one self-verifying frame.
//! [`FrameEncoder`] buffers writes, cuts frames at a block-size boundary,
//! and appends the empty terminator frame on `finish()`.
//!
//! The encoder and [`FrameDecoder`](crate::FrameDecoder) pin the same
//! convention: the compressed-size field counts the 9-byte frame sub-header,
//! and the checksum covers method + sizes + payload.

use bytes::{BufMut, Bytes, BytesMut};
use emberwire_core::cityhash::city_hash_128;
use emberwire_core::{Error, Result};
use tracing::trace;

use crate::frame::{
    Compression, CHECKSUM_SIZE, DEFAULT_BLOCK_SIZE, FRAME_HEADER_SIZE, MAX_FRAME_SIZE,
};

/// Encode one block of data as a single frame.
///
/// An empty `data` produces the terminator frame; callers streaming multiple
/// blocks should emit it exactly once, at the end.
pub fn encode_block(data: &[u8], method: Compression) -> Result<Bytes> {
    if data.len() > MAX_FRAME_SIZE as usize {
        return Err(Error::FrameTooLarge { size: data.len() });
    }
    // A compressed frame declaring zero output is malformed on the wire, so
    // the terminator is always written with method None.
    let method = if data.is_empty() {
        Compression::None
    } else {
        method
    };

    let payload = match method {
        Compression::None => Bytes::copy_from_slice(data),
        Compression::Lz4 => Bytes::from(lz4_flex::block::compress(data)),
        Compression::Zstd => return Err(Error::Unsupported("zstd compression")),
    };
    let compressed_size = payload.len() + FRAME_HEADER_SIZE;
    if compressed_size > MAX_FRAME_SIZE as usize {
        return Err(Error::FrameTooLarge {
            size: compressed_size,
        });
    }

    let mut body = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    body.put_u8(method.byte());
    body.put_u32_le(compressed_size as u32);
    body.put_u32_le(data.len() as u32);
    body.extend_from_slice(&payload);

    let mut frame = BytesMut::with_capacity(CHECKSUM_SIZE + body.len());
    frame.put_u128_le(city_hash_128(&body));
    frame.extend_from_slice(&body);

    trace!(
        compressed = compressed_size,
        uncompressed = data.len(),
        method = ?method,
        "encoded frame"
    );
    Ok(frame.freeze())
}

/// Buffered writer that splits a byte stream into fixed-size frames.
pub struct FrameEncoder {
    method: Compression,
    block_size: usize,

    /// Uncompressed bytes not yet cut into a frame.
    block: BytesMut,

    /// Completed frames.
    out: BytesMut,
}

impl FrameEncoder {
    pub fn new(method: Compression) -> Self {
        Self::with_block_size(method, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(method: Compression, block_size: usize) -> Self {
        Self {
            method,
            block_size: block_size.max(1),
            block: BytesMut::new(),
            out: BytesMut::new(),
        }
    }

    /// Buffer `data`, cutting a frame each time a full block accumulates.
    pub fn write(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let room = self.block_size - self.block.len();
            let take = room.min(data.len());
            self.block.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.block.len() == self.block_size {
                self.flush_block()?;
            }
        }
        Ok(())
    }

    /// Cut the buffered bytes into a frame now, even if the block is short.
    pub fn flush_block(&mut self) -> Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let frame = encode_block(&self.block, self.method)?;
        self.out.extend_from_slice(&frame);
        self.block.clear();
        Ok(())
    }

    /// Flush the partial block and append the terminator frame.
    pub fn finish(mut self) -> Result<Bytes> {
        self.flush_block()?;
        let terminator = encode_block(&[], self.method)?;
        self.out.extend_from_slice(&terminator);
        Ok(self.out.freeze())
    }
}
