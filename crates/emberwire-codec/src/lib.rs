//! Emberwire Framed Compression Codec
//!
//! This crate implements the self-framing, checksum-verified compressed
//! transport the query service wraps every result stream in (and accepts on
//! upload). It is a symmetric pair: [`FrameDecoder`] turns transport chunks
//! back into raw wire bytes, [`FrameEncoder`] turns raw bytes into frames.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Checksum (16 bytes)                                         │
//! │ - CityHash v1.0.2 128-bit, low word first, little-endian    │
//! │ - Covers method byte + both size fields + payload           │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Method (1 byte): 0x02 None / 0x82 Lz4 / 0x90 Zstd           │
//! │ Compressed size (4 bytes, LE)                               │
//! │ - Counts the 9-byte sub-header plus the payload             │
//! │ Uncompressed size (4 bytes, LE)                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Payload (compressed_size - 9 bytes)                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why This Design?
//!
//! - The checksum is verified **before** any decompression: a frame that
//!   fails verification is never fed to the codec library.
//! - `compressed_size` counting its own sub-header is the server's framing
//!   convention; get it wrong and every frame after the first misaligns.
//!   A conformance test pins the convention with hand-laid bytes.
//! - A zero-length `None` frame is a valid terminator signalling clean end;
//!   a zero-`uncompressed_size` *compressed* frame is malformed and is
//!   rejected rather than silently producing empty output.
//! - End-of-input between frames is a clean end; end-of-input mid-frame is
//!   `TruncatedStream`.

mod decoder;
mod encoder;
mod frame;

pub use decoder::FrameDecoder;
pub use encoder::{encode_block, FrameEncoder};
pub use frame::{
    Compression, CHECKSUM_SIZE, DEFAULT_BLOCK_SIZE, FRAME_HEADER_SIZE, MAX_FRAME_SIZE,
};
