//! Byte-chunk sources feeding a result cursor.
//!
//! The cursor doesn't care where its bytes come from; [`ChunkSource`] is the
//! seam between it and the transport. The HTTP implementation streams a
//! response body; [`MemoryChunkSource`] replays captured bytes, which is how
//! the decode pipeline is tested without a server.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

use crate::error::Result;

/// An async pull source of transport chunks.
///
/// `next_chunk` returns `Ok(None)` exactly once, at end of input. Chunk
/// boundaries carry no meaning; the decoders reassemble across them.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Streams chunks out of an HTTP response body.
pub(crate) struct HttpChunkSource {
    response: reqwest::Response,
}

impl HttpChunkSource {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.response.chunk().await?)
    }
}

/// Replays a fixed sequence of chunks from memory.
pub struct MemoryChunkSource {
    chunks: VecDeque<Bytes>,
}

impl MemoryChunkSource {
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// One chunk per `size` bytes of `data`.
    pub fn chunked(data: &[u8], size: usize) -> Self {
        Self::new(
            data.chunks(size.max(1))
                .map(Bytes::copy_from_slice)
                .collect::<Vec<_>>(),
        )
    }
}

#[async_trait]
impl ChunkSource for MemoryChunkSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }
}
