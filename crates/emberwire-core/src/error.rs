//! Error Types for the Emberwire Wire Protocol
//!
//! This module defines every way a result stream can fail between the raw
//! HTTP body and the typed rows handed to the caller.
//!
//! ## Error Categories
//!
//! ### Frame Errors
//! - `CorruptFrame`: checksum mismatch; the frame is never decompressed
//! - `MalformedFrame`: structurally invalid frame header or payload
//! - `FrameTooLarge`: a block exceeds the 1 GiB frame limit on encode
//! - `UnsupportedCompression`: unknown compression method byte
//! - `Unsupported`: recognized but not-yet-implemented method (Zstd)
//! - `Decompression`: the codec library rejected a verified payload
//!
//! ### Stream Errors
//! - `TruncatedStream`: end-of-input mid-frame or mid-row, distinguished
//!   from a clean end-of-stream between frames/rows
//!
//! ### Result-Set Errors
//! - `MalformedHeader`: unparsable column count/name/type grammar (fatal at
//!   open time, never per-row)
//! - `UnknownType`: declared type not in the registry (fatal at open time)
//! - `CellDecodeMismatch`: a cell's bytes don't satisfy its resolved type
//!
//! None of these are retried internally: a partially-consumed compressed
//! stream cannot be resumed, so retry (if any) means re-issuing the query at
//! the transport layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Frame checksum did not match the recomputed fingerprint.
    ///
    /// The frame is discarded without attempting decompression; no partial
    /// trust is extended to a frame that fails verification.
    #[error("corrupt frame {frame_index}: checksum mismatch (stored {expected:032x}, computed {actual:032x})")]
    CorruptFrame {
        frame_index: u64,
        expected: u128,
        actual: u128,
    },

    /// Frame header or payload is structurally invalid.
    #[error("malformed frame {frame_index}: {reason}")]
    MalformedFrame { frame_index: u64, reason: String },

    /// A block handed to the encoder exceeds the frame size limit.
    #[error("block of {size} bytes exceeds the maximum frame size")]
    FrameTooLarge { size: usize },

    /// Unknown compression method byte.
    #[error("unsupported compression method byte 0x{0:02x}")]
    UnsupportedCompression(u8),

    /// Recognized but not implemented.
    #[error("unsupported feature: {0}")]
    Unsupported(&'static str),

    /// Input ended mid-frame or mid-row.
    #[error("truncated stream: input ended inside {context} at byte offset {offset}")]
    TruncatedStream { context: &'static str, offset: u64 },

    /// Column count, name, or declared-type grammar could not be parsed.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Declared column type is not in the type registry.
    #[error("unknown column type '{0}'")]
    UnknownType(String),

    /// A cell's bytes don't satisfy its column's resolved type.
    #[error("column {column} ('{name}'): {reason}")]
    CellDecodeMismatch {
        column: usize,
        name: String,
        reason: String,
    },

    /// Decompression failed on a checksum-verified payload.
    #[error("decompression failed in frame {frame_index}: {reason}")]
    Decompression { frame_index: u64, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
