//! Frame Decoder - Decompressing the Result Transport
//!
//! [`FrameDecoder`] is the reading half of the codec: an incremental state
//! machine that accepts transport chunks of any size and yields verified,
//! decompressed blocks.
//!
//! ## Per-Frame State Machine
//!
//! 1. Read the 16-byte candidate checksum.
//! 2. Read method byte + compressed size + uncompressed size (9 bytes) and
//!    validate them structurally before waiting for the payload.
//! 3. Read `compressed_size - 9` payload bytes.
//! 4. Recompute the fingerprint over method + sizes + payload and compare;
//!    a mismatch is `CorruptFrame` and nothing is decompressed.
//! 5. Decompress into exactly `uncompressed_size` bytes; any length
//!    mismatch is fatal.
//! 6. Emit the block and return to step 1.
//!
//! The decoder never blocks: when the buffered bytes don't cover the next
//! step it parks and reports "need more input". `finish()` is how clean
//! end-of-stream (between frames) is told apart from truncation (mid-frame).
//!
//! ## Thread Safety
//!
//! Not thread-safe; the decoder is the single owner of its byte cursor. Use
//! one decoder per result set.

use bytes::{Buf, Bytes, BytesMut};
use emberwire_core::cityhash::city_hash_128;
use emberwire_core::{Error, Result};
use tracing::trace;

use crate::frame::{Compression, CHECKSUM_SIZE, FRAME_HEADER_SIZE, MAX_FRAME_SIZE};

/// Incremental reader for the framed compressed transport.
pub struct FrameDecoder {
    /// Bytes received but not yet consumed.
    buf: BytesMut,

    /// Index of the frame currently being read, for error context.
    frame_index: u64,

    /// Stream offset of the start of `buf`.
    consumed: u64,

    /// Set when the empty terminator frame has been read.
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            frame_index: 0,
            consumed: 0,
            finished: false,
        }
    }

    /// Append a transport chunk to the internal buffer.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Whether the empty terminator frame has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Try to decode the next frame into a decompressed block.
    ///
    /// Returns `Ok(None)` when more input is needed (or after the
    /// terminator); the buffered bytes are left untouched in that case.
    pub fn try_next_block(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            if !self.buf.is_empty() {
                return Err(Error::MalformedFrame {
                    frame_index: self.frame_index,
                    reason: format!("{} bytes after terminator frame", self.buf.len()),
                });
            }
            return Ok(None);
        }

        if self.buf.len() < CHECKSUM_SIZE + FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &self.buf[..CHECKSUM_SIZE + FRAME_HEADER_SIZE];
        let stored = header.get_u128_le();
        let method_byte = header.get_u8();
        let compressed_size = header.get_u32_le();
        let uncompressed_size = header.get_u32_le();

        // Structural validation happens before waiting for the payload, so
        // a nonsense size field fails now instead of stalling forever.
        if (compressed_size as usize) < FRAME_HEADER_SIZE {
            return Err(self.malformed(format!(
                "compressed size {} is smaller than the frame sub-header",
                compressed_size
            )));
        }
        if compressed_size > MAX_FRAME_SIZE || uncompressed_size > MAX_FRAME_SIZE {
            return Err(self.malformed(format!(
                "frame of {} -> {} bytes exceeds the size limit",
                compressed_size, uncompressed_size
            )));
        }
        let method = Compression::try_from(method_byte)?;
        if uncompressed_size == 0 && method != Compression::None {
            return Err(self.malformed(
                "zero uncompressed size with a compressed method".to_string(),
            ));
        }

        let total = CHECKSUM_SIZE + compressed_size as usize;
        if self.buf.len() < total {
            return Ok(None);
        }

        // Verify before trusting anything: method, sizes, and payload are
        // all under the checksum.
        let actual = city_hash_128(&self.buf[CHECKSUM_SIZE..total]);
        if actual != stored {
            return Err(Error::CorruptFrame {
                frame_index: self.frame_index,
                expected: stored,
                actual,
            });
        }

        let payload = &self.buf[CHECKSUM_SIZE + FRAME_HEADER_SIZE..total];
        let block = match method {
            Compression::None => {
                if payload.len() != uncompressed_size as usize {
                    return Err(self.malformed(format!(
                        "uncompressed frame carries {} bytes but declares {}",
                        payload.len(),
                        uncompressed_size
                    )));
                }
                Bytes::copy_from_slice(payload)
            }
            Compression::Lz4 => {
                let out = lz4_flex::block::decompress(payload, uncompressed_size as usize)
                    .map_err(|e| Error::Decompression {
                        frame_index: self.frame_index,
                        reason: e.to_string(),
                    })?;
                if out.len() != uncompressed_size as usize {
                    return Err(Error::Decompression {
                        frame_index: self.frame_index,
                        reason: format!(
                            "decompressed to {} bytes, declared {}",
                            out.len(),
                            uncompressed_size
                        ),
                    });
                }
                Bytes::from(out)
            }
            Compression::Zstd => return Err(Error::Unsupported("zstd decompression")),
        };

        trace!(
            frame = self.frame_index,
            compressed = compressed_size,
            uncompressed = uncompressed_size,
            method = ?method,
            "decoded frame"
        );

        self.buf.advance(total);
        self.consumed += total as u64;
        self.frame_index += 1;

        if uncompressed_size == 0 {
            self.finished = true;
            return Ok(None);
        }
        Ok(Some(block))
    }

    /// Validate end-of-input: clean between frames, `TruncatedStream` if the
    /// transport stopped mid-frame.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::TruncatedStream {
                context: "frame",
                offset: self.consumed + self.buf.len() as u64,
            })
        }
    }

    fn malformed(&self, reason: String) -> Error {
        Error::MalformedFrame {
            frame_index: self.frame_index,
            reason,
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_block;

    fn decode_all(stream: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();
        for chunk in stream.chunks(chunk_size.max(1)) {
            decoder.feed(chunk);
            while let Some(block) = decoder.try_next_block()? {
                out.extend_from_slice(&block);
            }
        }
        // Drain anything completed by the final chunk
        while let Some(block) = decoder.try_next_block()? {
            out.extend_from_slice(&block);
        }
        decoder.finish()?;
        Ok(out)
    }

    #[test]
    fn test_roundtrip_none() {
        let data = b"hello wire format";
        let frame = encode_block(data, Compression::None).unwrap();
        assert_eq!(decode_all(&frame, frame.len()).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_lz4() {
        let data = vec![0xABu8; 4096];
        let frame = encode_block(&data, Compression::Lz4).unwrap();
        assert!(frame.len() < data.len());
        assert_eq!(decode_all(&frame, frame.len()).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_multi_frame_all_chunk_sizes() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode_block(b"first block ", Compression::Lz4).unwrap());
        stream.extend_from_slice(&encode_block(b"second block", Compression::None).unwrap());
        for chunk_size in [1, 2, 3, 7, 16, 25, 64, stream.len()] {
            assert_eq!(
                decode_all(&stream, chunk_size).unwrap(),
                b"first block second block",
                "chunk size {}",
                chunk_size
            );
        }
    }

    #[test]
    fn test_compressed_size_counts_its_own_subheader() {
        // Hand-laid uncompressed frame: 3 payload bytes, so the size field
        // must read 12, not 3. This pins the server convention.
        let payload = [0x01u8, 0x02, 0x03];
        let mut body = Vec::new();
        body.push(0x02); // method: None
        body.extend_from_slice(&12u32.to_le_bytes()); // compressed: 9 + 3
        body.extend_from_slice(&3u32.to_le_bytes()); // uncompressed
        body.extend_from_slice(&payload);
        let mut frame = Vec::new();
        frame.extend_from_slice(&city_hash_128(&body).to_le_bytes());
        frame.extend_from_slice(&body);

        assert_eq!(decode_all(&frame, frame.len()).unwrap(), payload);
        // And the encoder writes the same convention.
        assert_eq!(encode_block(&payload, Compression::None).unwrap(), frame);
    }

    #[test]
    fn test_bit_flip_anywhere_is_fatal() {
        let frame = encode_block(b"integrity", Compression::Lz4).unwrap();
        // Flip every bit position past the checksum (method, sizes,
        // payload); none may decode successfully.
        for byte_idx in CHECKSUM_SIZE..frame.len() {
            for bit in 0..8 {
                let mut copy = frame.to_vec();
                copy[byte_idx] ^= 1 << bit;
                let mut decoder = FrameDecoder::new();
                decoder.feed(&copy);
                let result = decoder.try_next_block();
                let ok = matches!(result, Ok(Some(_)));
                assert!(
                    !ok,
                    "flipping bit {} of byte {} decoded successfully",
                    bit, byte_idx
                );
            }
        }
    }

    #[test]
    fn test_checksum_flip_is_corrupt_frame() {
        let frame = encode_block(b"payload", Compression::None).unwrap();
        let mut copy = frame.to_vec();
        copy[0] ^= 0x80;
        let mut decoder = FrameDecoder::new();
        decoder.feed(&copy);
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::CorruptFrame { frame_index: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_mid_payload() {
        let frame = encode_block(b"some longer payload here", Compression::None).unwrap();
        let mut decoder = FrameDecoder::new();
        // Cut the stream 3 bytes into the payload region
        decoder.feed(&frame[..CHECKSUM_SIZE + FRAME_HEADER_SIZE + 3]);
        assert!(decoder.try_next_block().unwrap().is_none());
        assert!(matches!(
            decoder.finish(),
            Err(Error::TruncatedStream {
                context: "frame",
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_mid_checksum() {
        let frame = encode_block(b"x", Compression::None).unwrap();
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame[..7]);
        assert!(decoder.try_next_block().unwrap().is_none());
        assert!(matches!(decoder.finish(), Err(Error::TruncatedStream { .. })));
    }

    #[test]
    fn test_clean_end_between_frames() {
        let frame = encode_block(b"complete", Compression::None).unwrap();
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);
        assert!(decoder.try_next_block().unwrap().is_some());
        assert!(decoder.try_next_block().unwrap().is_none());
        decoder.finish().unwrap();
        assert!(!decoder.is_finished()); // no explicit terminator, just EOF
    }

    #[test]
    fn test_empty_terminator_frame() {
        let mut stream = encode_block(b"data", Compression::None).unwrap().to_vec();
        stream.extend_from_slice(&encode_block(&[], Compression::None).unwrap());
        let mut decoder = FrameDecoder::new();
        decoder.feed(&stream);
        assert_eq!(decoder.try_next_block().unwrap().unwrap(), &b"data"[..]);
        assert!(decoder.try_next_block().unwrap().is_none());
        assert!(decoder.is_finished());
        decoder.finish().unwrap();
    }

    #[test]
    fn test_bytes_after_terminator_rejected() {
        let mut stream = encode_block(&[], Compression::None).unwrap().to_vec();
        stream.push(0xAA);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&stream);
        assert!(decoder.try_next_block().unwrap().is_none());
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_zero_uncompressed_with_lz4_method_rejected() {
        // A compressed frame declaring zero output masks upstream bugs;
        // build one by hand (the encoder refuses to).
        let mut body = vec![0x82u8];
        let payload = lz4_flex::block::compress(&[]);
        body.extend_from_slice(&((payload.len() + 9) as u32).to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&payload);
        let mut frame = city_hash_128(&body).to_le_bytes().to_vec();
        frame.extend_from_slice(&body);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_unknown_method_byte() {
        let frame = encode_block(b"abc", Compression::None).unwrap();
        let mut copy = frame.to_vec();
        copy[CHECKSUM_SIZE] = 0x55;
        let mut decoder = FrameDecoder::new();
        decoder.feed(&copy);
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::UnsupportedCompression(0x55))
        ));
    }

    #[test]
    fn test_undersized_compressed_size_field() {
        let mut body = vec![0x02u8];
        body.extend_from_slice(&5u32.to_le_bytes()); // < 9
        body.extend_from_slice(&0u32.to_le_bytes());
        let mut frame = city_hash_128(&body).to_le_bytes().to_vec();
        frame.extend_from_slice(&body);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_oversized_size_field_fails_fast() {
        // Declares 512 MiB over the limit; must fail without waiting for
        // the (never-arriving) payload.
        let mut body = vec![0x02u8];
        body.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_le_bytes());
        body.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_le_bytes());
        let mut frame = city_hash_128(&body).to_le_bytes().to_vec();
        frame.extend_from_slice(&body);
        let mut decoder = FrameDecoder::new();
        decoder.feed(&frame);
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_frame_index_in_errors() {
        let mut stream = encode_block(b"good frame", Compression::None)
            .unwrap()
            .to_vec();
        let second = encode_block(b"bad frame", Compression::None).unwrap();
        let mut corrupted = second.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        stream.extend_from_slice(&corrupted);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&stream);
        assert!(decoder.try_next_block().unwrap().is_some());
        assert!(matches!(
            decoder.try_next_block(),
            Err(Error::CorruptFrame { frame_index: 1, .. })
        ));
    }
}
