//! Variable-length Integer Encoding (Varint)
//!
//! The wire format length-prefixes everything variable-width (column names,
//! declared-type strings, string cells, array element counts) with unsigned
//! LEB128 varints:
//!
//! - Each byte carries 7 bits of payload and 1 continuation bit
//! - Values 0-127 use a single byte, which covers almost every length prefix
//!   in practice
//! - At most 10 bytes encode a full u64
//!
//! Decoding is fallible rather than panicking: the row decoder routinely
//! attempts a parse over a partially-received buffer, and "ran out of bytes"
//! must be reported as [`VarintError::Incomplete`] (wait for more input), not
//! as corruption. A continuation chain exceeding 64 bits is
//! [`VarintError::Overflow`] and is always fatal.

use bytes::{Buf, BufMut};

/// Why a varint failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ended before the final (continuation-bit-clear) byte.
    Incomplete,
    /// More than 10 bytes / 64 bits of continuation.
    Overflow,
}

/// Encode an unsigned integer as a LEB128 varint.
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Decode a LEB128 varint to an unsigned integer.
pub fn decode_varint_u64(buf: &mut impl Buf) -> Result<u64, VarintError> {
    let mut value: u64 = 0;
    let mut shift = 0;

    loop {
        if !buf.has_remaining() {
            return Err(VarintError::Incomplete);
        }
        let byte = buf.get_u8();
        if shift == 63 && byte > 1 {
            return Err(VarintError::Overflow);
        }
        value |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok(value);
        }

        shift += 7;

        if shift > 63 {
            return Err(VarintError::Overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip(value: u64) -> u64 {
        let mut buf = BytesMut::new();
        encode_varint_u64(&mut buf, value);
        decode_varint_u64(&mut buf.as_ref()).unwrap()
    }

    #[test]
    fn test_varint_small_values() {
        for v in 0..=127u64 {
            let mut buf = BytesMut::new();
            encode_varint_u64(&mut buf, v);
            assert_eq!(buf.len(), 1, "value {} should use one byte", v);
            assert_eq!(roundtrip(v), v);
        }
    }

    #[test]
    fn test_varint_boundaries() {
        for v in [128, 16_383, 16_384, 2_097_151, u32::MAX as u64, u64::MAX] {
            assert_eq!(roundtrip(v), v);
        }
    }

    #[test]
    fn test_varint_max_encoding_length() {
        let mut buf = BytesMut::new();
        encode_varint_u64(&mut buf, u64::MAX);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_varint_incomplete() {
        // A lone continuation byte has no terminator
        let data = [0x80u8];
        assert_eq!(
            decode_varint_u64(&mut &data[..]),
            Err(VarintError::Incomplete)
        );

        let empty: [u8; 0] = [];
        assert_eq!(
            decode_varint_u64(&mut &empty[..]),
            Err(VarintError::Incomplete)
        );
    }

    #[test]
    fn test_varint_overflow() {
        // 11 continuation bytes can never terminate inside 64 bits
        let data = [0xFFu8; 11];
        assert_eq!(
            decode_varint_u64(&mut &data[..]),
            Err(VarintError::Overflow)
        );
    }

    #[test]
    fn test_varint_consumes_exact_bytes() {
        let mut buf = BytesMut::new();
        encode_varint_u64(&mut buf, 300);
        encode_varint_u64(&mut buf, 7);
        let mut cursor = buf.as_ref();
        assert_eq!(decode_varint_u64(&mut cursor).unwrap(), 300);
        assert_eq!(decode_varint_u64(&mut cursor).unwrap(), 7);
        assert!(cursor.is_empty());
    }
}
