//! Frame constants and the compression method registry.

use emberwire_core::Error;

/// Size of the leading 128-bit checksum.
pub const CHECKSUM_SIZE: usize = 16;

/// Method byte plus the two size fields. `compressed_size` counts these
/// 9 bytes as part of itself, per the server's framing convention.
pub const FRAME_HEADER_SIZE: usize = 9;

/// Upper bound on either size field (1 GiB). Anything larger is treated as
/// a malformed frame rather than an allocation request.
pub const MAX_FRAME_SIZE: u32 = 1 << 30;

/// Default encoder block size before a frame is cut.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Compression method for a frame. The byte values are the server's; they
/// travel on the wire and participate in the checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    None = 0x02,
    Lz4 = 0x82,
    Zstd = 0x90,
}

impl Compression {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Compression {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x02 => Ok(Compression::None),
            0x82 => Ok(Compression::Lz4),
            0x90 => Ok(Compression::Zstd),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}
