//! Per-cell wire decoding, driven by the column's resolved type.
//!
//! Every decoder here follows the same contract: on success the cursor has
//! advanced past exactly one cell; on `Incomplete` the caller discards the
//! cursor and retries later; on `Fatal` the stream is dead. Scalars are
//! fixed-width little-endian; everything variable-width is varint prefixed.

use bytes::{Buf, Bytes};
use chrono::DateTime;
use emberwire_core::varint::{decode_varint_u64, VarintError};
use emberwire_core::{Decimal, Error, ResolvedType, Value};

use super::{WireError, WireResult};

/// Decode one cell of `ty` from the front of `cur`.
pub(crate) fn decode_value(
    cur: &mut &[u8],
    ty: &ResolvedType,
    column: usize,
    name: &str,
) -> WireResult<Value> {
    let value = match ty {
        ResolvedType::Int8 => Value::Int8(fixed(cur, 1)?.get_i8()),
        ResolvedType::Int16 => Value::Int16(fixed(cur, 2)?.get_i16_le()),
        ResolvedType::Int32 => Value::Int32(fixed(cur, 4)?.get_i32_le()),
        ResolvedType::Int64 => Value::Int64(fixed(cur, 8)?.get_i64_le()),
        ResolvedType::UInt8 => Value::UInt8(fixed(cur, 1)?.get_u8()),
        ResolvedType::UInt16 => Value::UInt16(fixed(cur, 2)?.get_u16_le()),
        ResolvedType::UInt32 => Value::UInt32(fixed(cur, 4)?.get_u32_le()),
        ResolvedType::UInt64 => Value::UInt64(fixed(cur, 8)?.get_u64_le()),
        ResolvedType::Float32 => Value::Float32(fixed(cur, 4)?.get_f32_le()),
        ResolvedType::Float64 => Value::Float64(fixed(cur, 8)?.get_f64_le()),

        ResolvedType::Bool => match fixed(cur, 1)?.get_u8() {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            byte => {
                return Err(mismatch(
                    column,
                    name,
                    format!("invalid boolean byte 0x{:02x}", byte),
                ))
            }
        },

        ResolvedType::String => {
            let bytes = var_bytes(cur, column, name)?;
            let text = std::str::from_utf8(bytes)
                .map_err(|_| mismatch(column, name, "string cell is not UTF-8".to_string()))?;
            Value::Text(text.to_string())
        }

        ResolvedType::FixedString(n) => Value::Binary(Bytes::copy_from_slice(fixed(cur, *n)?)),

        ResolvedType::Date => {
            let days = fixed(cur, 2)?.get_u16_le();
            Value::Date(date_from_days(days as i64, column, name)?)
        }
        ResolvedType::Date32 => {
            let days = fixed(cur, 4)?.get_i32_le();
            Value::Date(date_from_days(days as i64, column, name)?)
        }

        // Timezone identifiers on DateTime types are display metadata; the
        // wire value is always a UTC offset.
        ResolvedType::DateTime { .. } => {
            let secs = fixed(cur, 4)?.get_u32_le();
            Value::Timestamp(timestamp(secs as i64, 0, column, name)?)
        }
        ResolvedType::DateTime64 { precision, .. } => {
            let ticks = fixed(cur, 8)?.get_i64_le();
            let per_sec = 10i64.pow(*precision as u32);
            let secs = ticks.div_euclid(per_sec);
            let frac = ticks.rem_euclid(per_sec);
            let nanos = (frac * 10i64.pow(9 - *precision as u32)) as u32;
            Value::Timestamp(timestamp(secs, nanos, column, name)?)
        }

        ResolvedType::Decimal { precision, scale } => {
            let unscaled: i128 = if *precision <= 9 {
                fixed(cur, 4)?.get_i32_le() as i128
            } else if *precision <= 18 {
                fixed(cur, 8)?.get_i64_le() as i128
            } else {
                fixed(cur, 16)?.get_i128_le()
            };
            Value::Decimal(Decimal::new(unscaled, *scale))
        }

        ResolvedType::Nullable(inner) => match fixed(cur, 1)?.get_u8() {
            1 => Value::Null,
            0 => decode_value(cur, inner, column, name)?,
            byte => {
                return Err(mismatch(
                    column,
                    name,
                    format!("invalid null flag 0x{:02x}", byte),
                ))
            }
        },

        ResolvedType::Array(inner) => {
            let count = var_count(cur, column, name)? as usize;
            let mut elements = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                elements.push(decode_value(cur, inner, column, name)?);
            }
            Value::Array(elements)
        }

        ResolvedType::Tuple(fields) => {
            let mut elements = Vec::with_capacity(fields.len());
            for field in fields {
                elements.push(decode_value(cur, &field.ty, column, name)?);
            }
            Value::Tuple(elements)
        }
    };
    Ok(value)
}

/// Take exactly `n` bytes off the front of the cursor.
fn fixed<'a>(cur: &mut &'a [u8], n: usize) -> WireResult<&'a [u8]> {
    if cur.len() < n {
        return Err(WireError::Incomplete);
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}

fn var_count(cur: &mut &[u8], column: usize, name: &str) -> WireResult<u64> {
    decode_varint_u64(cur).map_err(|e| match e {
        VarintError::Incomplete => WireError::Incomplete,
        VarintError::Overflow => mismatch(column, name, "varint overflow".to_string()),
    })
}

fn var_bytes<'a>(cur: &mut &'a [u8], column: usize, name: &str) -> WireResult<&'a [u8]> {
    let len = var_count(cur, column, name)? as usize;
    fixed(cur, len)
}

fn date_from_days(days: i64, column: usize, name: &str) -> WireResult<chrono::NaiveDate> {
    DateTime::from_timestamp(days * 86_400, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| mismatch(column, name, format!("day count {} out of range", days)))
}

fn timestamp(
    secs: i64,
    nanos: u32,
    column: usize,
    name: &str,
) -> WireResult<chrono::DateTime<chrono::Utc>> {
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| mismatch(column, name, format!("timestamp {}s out of range", secs)))
}

fn mismatch(column: usize, name: &str, reason: String) -> WireError {
    WireError::Fatal(Error::CellDecodeMismatch {
        column,
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use emberwire_core::varint::encode_varint_u64;

    fn decode_one(bytes: &[u8], ty: &str) -> Value {
        let ty = ResolvedType::parse(ty).unwrap();
        let mut cur = bytes;
        let value = decode_value(&mut cur, &ty, 0, "c").unwrap();
        assert!(cur.is_empty(), "cell left {} trailing bytes", cur.len());
        value
    }

    fn decode_err(bytes: &[u8], ty: &str) -> Error {
        let ty = ResolvedType::parse(ty).unwrap();
        let mut cur = bytes;
        match decode_value(&mut cur, &ty, 3, "c") {
            Err(WireError::Fatal(e)) => e,
            Err(WireError::Incomplete) => panic!("incomplete, expected fatal"),
            Ok(v) => panic!("decoded {:?}, expected fatal", v),
        }
    }

    #[test]
    fn test_fixed_width_scalars() {
        assert_eq!(decode_one(&[0xFF], "Int8"), Value::Int8(-1));
        assert_eq!(decode_one(&1000i16.to_le_bytes(), "Int16"), Value::Int16(1000));
        assert_eq!(decode_one(&7i32.to_le_bytes(), "Int32"), Value::Int32(7));
        assert_eq!(
            decode_one(&(-5i64).to_le_bytes(), "Int64"),
            Value::Int64(-5)
        );
        assert_eq!(decode_one(&[200], "UInt8"), Value::UInt8(200));
        assert_eq!(
            decode_one(&u64::MAX.to_le_bytes(), "UInt64"),
            Value::UInt64(u64::MAX)
        );
        assert_eq!(
            decode_one(&1.25f32.to_le_bytes(), "Float32"),
            Value::Float32(1.25)
        );
        assert_eq!(
            decode_one(&(-0.5f64).to_le_bytes(), "Float64"),
            Value::Float64(-0.5)
        );
    }

    #[test]
    fn test_bool_strict() {
        assert_eq!(decode_one(&[0], "Bool"), Value::Bool(false));
        assert_eq!(decode_one(&[1], "Bool"), Value::Bool(true));
        assert!(matches!(
            decode_err(&[2], "Bool"),
            Error::CellDecodeMismatch { column: 3, .. }
        ));
    }

    #[test]
    fn test_string_and_fixed_string() {
        let mut wire = Vec::new();
        encode_varint_u64(&mut wire, 5);
        wire.extend_from_slice(b"hello");
        assert_eq!(decode_one(&wire, "String"), Value::Text("hello".into()));

        assert_eq!(
            decode_one(b"ab\0", "FixedString(3)"),
            Value::Binary(Bytes::from_static(b"ab\0"))
        );

        let mut bad = Vec::new();
        encode_varint_u64(&mut bad, 2);
        bad.extend_from_slice(&[0xFF, 0xFE]);
        assert!(matches!(
            decode_err(&bad, "String"),
            Error::CellDecodeMismatch { .. }
        ));
    }

    #[test]
    fn test_dates() {
        // 2004-09-08 is 12669 days after the epoch
        assert_eq!(
            decode_one(&12669u16.to_le_bytes(), "Date"),
            Value::Date(NaiveDate::from_ymd_opt(2004, 9, 8).unwrap())
        );
        // Date32 reaches before the epoch
        assert_eq!(
            decode_one(&(-1i32).to_le_bytes(), "Date32"),
            Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap())
        );
    }

    #[test]
    fn test_datetime_seconds() {
        let expected = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            decode_one(&1609459200u32.to_le_bytes(), "DateTime"),
            Value::Timestamp(expected)
        );
        // The timezone argument changes nothing about the decoded instant.
        assert_eq!(
            decode_one(&1609459200u32.to_le_bytes(), "DateTime('Asia/Tokyo')"),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn test_datetime64_subsecond() {
        // 1609459200.123 seconds at millisecond precision
        let ticks = 1609459200123i64;
        let expected = Utc
            .with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(123))
            .unwrap();
        assert_eq!(
            decode_one(&ticks.to_le_bytes(), "DateTime64(3)"),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn test_datetime64_negative_ticks_floor() {
        // -1 tick at precision 3 is 999ms before the epoch
        let expected = DateTime::from_timestamp(-1, 999_000_000).unwrap();
        assert_eq!(
            decode_one(&(-1i64).to_le_bytes(), "DateTime64(3)"),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn test_decimal_widths() {
        assert_eq!(
            decode_one(&12345i32.to_le_bytes(), "Decimal(9, 2)"),
            Value::Decimal(Decimal::new(12345, 2))
        );
        assert_eq!(
            decode_one(&(-98765i64).to_le_bytes(), "Decimal(18, 4)"),
            Value::Decimal(Decimal::new(-98765, 4))
        );
        assert_eq!(
            decode_one(&7i128.to_le_bytes(), "Decimal(38, 0)"),
            Value::Decimal(Decimal::new(7, 0))
        );
    }

    #[test]
    fn test_nullable_flag() {
        let mut wire = vec![0u8];
        wire.extend_from_slice(&42i32.to_le_bytes());
        assert_eq!(decode_one(&wire, "Nullable(Int32)"), Value::Int32(42));
        assert_eq!(decode_one(&[1], "Nullable(Int32)"), Value::Null);
        assert!(matches!(
            decode_err(&[7], "Nullable(Int32)"),
            Error::CellDecodeMismatch { .. }
        ));
    }

    #[test]
    fn test_nested_array() {
        // [[1, 2], [], [3]]
        let mut wire = Vec::new();
        encode_varint_u64(&mut wire, 3);
        encode_varint_u64(&mut wire, 2);
        wire.extend_from_slice(&1i32.to_le_bytes());
        wire.extend_from_slice(&2i32.to_le_bytes());
        encode_varint_u64(&mut wire, 0);
        encode_varint_u64(&mut wire, 1);
        wire.extend_from_slice(&3i32.to_le_bytes());

        assert_eq!(
            decode_one(&wire, "Array(Array(Int32))"),
            Value::Array(vec![
                Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
                Value::Array(vec![]),
                Value::Array(vec![Value::Int32(3)]),
            ])
        );
    }

    #[test]
    fn test_tuple_in_order() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&9i32.to_le_bytes());
        encode_varint_u64(&mut wire, 2);
        wire.extend_from_slice(b"ok");
        assert_eq!(
            decode_one(&wire, "Tuple(id Int32, label String)"),
            Value::Tuple(vec![Value::Int32(9), Value::Text("ok".into())])
        );
    }

    #[test]
    fn test_incomplete_cursor_untouched_by_caller_contract() {
        let ty = ResolvedType::parse("Int64").unwrap();
        let mut cur: &[u8] = &[0x01, 0x02];
        assert!(matches!(
            decode_value(&mut cur, &ty, 0, "c"),
            Err(WireError::Incomplete)
        ));
    }
}
