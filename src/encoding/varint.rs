//! # Zigzag Variable-Length Integer Encoding
//!
//! Every length, tag count, property id and record-identity component in the
//! codec is written as a signed varint. The format must match byte-for-byte
//! for interoperability with external tools reading the same data.
//!
//! ## Encoding Format
//!
//! 1. Zigzag the signed value so small magnitudes become small unsigned
//!    numbers: `(v << 1) ^ (v >> 63)`.
//! 2. Emit 7 bits per byte, low-order group first. The high bit of each byte
//!    is set when more bytes follow.
//!
//! | Value | Zigzag | Bytes |
//! |-------|--------|-------|
//! | 0 | 0 | `00` |
//! | -1 | 1 | `01` |
//! | 1 | 2 | `02` |
//! | 63 | 126 | `7E` |
//! | 64 | 128 | `80 01` |
//! | -65 | 129 | `81 01` |
//! | i64::MAX | u64::MAX - 1 | 10 bytes |
//! | i64::MIN | u64::MAX | 10 bytes |
//!
//! ## Error Handling
//!
//! Decoding returns `CorruptData` when:
//! - the buffer ends before a byte without the continuation bit
//! - the continuation bit is still set on the 10th byte
//! - the 10th byte carries bits beyond the 64th
//!
//! ## Usage Example
//!
//! ```rust
//! use docbin::encoding::varint::{decode_varint, encode_varint, varint_len};
//!
//! let mut buf = [0u8; 10];
//! let written = encode_varint(-65, &mut buf);
//! assert_eq!(written, 2);
//! assert_eq!(varint_len(-65), 2);
//!
//! let (value, read) = decode_varint(&buf[..written]).unwrap();
//! assert_eq!((value, read), (-65, 2));
//! ```

use eyre::{bail, Result};

use super::cursor::ByteCursor;
use crate::config::{MAX_VARINT_LEN, VARINT_CONTINUATION, VARINT_PAYLOAD_BITS};
use crate::error::CodecError;

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub fn varint_len(value: i64) -> usize {
    let mut v = zigzag_encode(value);
    let mut len = 1;
    while v >= u64::from(VARINT_CONTINUATION) {
        v >>= VARINT_PAYLOAD_BITS;
        len += 1;
    }
    len
}

pub fn encode_varint(value: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut v = zigzag_encode(value);
    let mut i = 0;
    while v >= u64::from(VARINT_CONTINUATION) {
        buf[i] = (v as u8) | VARINT_CONTINUATION;
        v >>= VARINT_PAYLOAD_BITS;
        i += 1;
    }
    buf[i] = v as u8;
    i + 1
}

pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let mut result: u64 = 0;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        let shift = VARINT_PAYLOAD_BITS * i as u32;
        if i == MAX_VARINT_LEN - 1 {
            if byte & VARINT_CONTINUATION != 0 {
                bail!(CodecError::corrupt("unterminated varint: 10 bytes without end"));
            }
            if byte > 1 {
                bail!(CodecError::corrupt("varint overflows 64 bits"));
            }
        }
        result |= u64::from(byte & !VARINT_CONTINUATION) << shift;
        if byte & VARINT_CONTINUATION == 0 {
            return Ok((zigzag_decode(result), i + 1));
        }
    }
    bail!(CodecError::corrupt(format!(
        "truncated varint after {} bytes",
        buf.len().min(MAX_VARINT_LEN)
    )))
}

/// Appends `value` to the cursor and returns the new offset.
pub fn write_varint(cursor: &mut ByteCursor, value: i64) -> usize {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    cursor.write_bytes(&buf[..len])
}

pub fn read_varint<B: AsRef<[u8]>>(cursor: &mut ByteCursor<B>) -> Result<i64> {
    let start = cursor.offset();
    let (value, len) = decode_varint(&cursor.as_slice()[start.min(cursor.len())..])?;
    cursor.skip(len)?;
    Ok(value)
}

pub fn read_varint_i32<B: AsRef<[u8]>>(cursor: &mut ByteCursor<B>) -> Result<i32> {
    let value = read_varint(cursor)?;
    i32::try_from(value).map_err(|_| {
        CodecError::corrupt(format!("varint {} does not fit in 32 bits", value)).into()
    })
}

/// Reads a length or count. Negative values and lengths larger than the
/// bytes left in the buffer are corrupt; every counted item needs at least
/// one byte, so the same bound applies to element counts.
pub fn read_varint_len<B: AsRef<[u8]>>(cursor: &mut ByteCursor<B>) -> Result<usize> {
    let value = read_varint(cursor)?;
    match usize::try_from(value) {
        Ok(len) if len <= cursor.remaining() => Ok(len),
        _ => bail!(CodecError::corrupt(format!(
            "invalid length {} with {} bytes remaining",
            value,
            cursor.remaining()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_maps_small_magnitudes_to_small_codes() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
    }

    #[test]
    fn zigzag_decode_inverts_encode() {
        for v in [0, 1, -1, 63, -64, 1 << 40, i64::MIN, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn varint_len_boundaries() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(63), 1);
        assert_eq!(varint_len(-64), 1);
        assert_eq!(varint_len(64), 2);
        assert_eq!(varint_len(-65), 2);
        assert_eq!(varint_len(8191), 2);
        assert_eq!(varint_len(8192), 3);
        assert_eq!(varint_len(i64::MAX), 10);
        assert_eq!(varint_len(i64::MIN), 10);
    }

    #[test]
    fn encode_varint_known_bytes() {
        let mut buf = [0u8; MAX_VARINT_LEN];

        assert_eq!(encode_varint(0, &mut buf), 1);
        assert_eq!(buf[0], 0x00);

        assert_eq!(encode_varint(-1, &mut buf), 1);
        assert_eq!(buf[0], 0x01);

        assert_eq!(encode_varint(1, &mut buf), 1);
        assert_eq!(buf[0], 0x02);

        assert_eq!(encode_varint(64, &mut buf), 2);
        assert_eq!(&buf[..2], &[0x80, 0x01]);

        assert_eq!(encode_varint(300, &mut buf), 2);
        assert_eq!(&buf[..2], &[0xD8, 0x04]);
    }

    #[test]
    fn extremes_round_trip_exactly() {
        let mut buf = [0u8; MAX_VARINT_LEN];
        for v in [i64::MIN, i64::MIN + 1, -1, 0, 1, i64::MAX - 1, i64::MAX] {
            let len = encode_varint(v, &mut buf);
            assert_eq!(len, varint_len(v));
            assert_eq!(decode_varint(&buf[..len]).unwrap(), (v, len));
        }
    }

    #[test]
    fn i64_min_encodes_as_ten_bytes() {
        let mut buf = [0u8; MAX_VARINT_LEN];
        assert_eq!(encode_varint(i64::MIN, &mut buf), 10);
        assert_eq!(&buf[..9], &[0xFF; 9]);
        assert_eq!(buf[9], 0x01);
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let buf = [0x80, 0x01, 0xAA, 0xBB];
        assert_eq!(decode_varint(&buf).unwrap(), (64, 2));
    }

    #[test]
    fn decode_rejects_empty_and_truncated() {
        assert!(decode_varint(&[]).is_err());
        let err = decode_varint(&[0x80, 0x80]).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn decode_rejects_unterminated_varint() {
        let buf = [0xFFu8; 12];
        let err = decode_varint(&buf).unwrap_err();
        assert!(matches!(
            CodecError::of(&err),
            Some(CodecError::CorruptData(_))
        ));
    }

    #[test]
    fn decode_rejects_overflowing_tenth_byte() {
        let mut buf = [0xFFu8; 10];
        buf[9] = 0x02;
        assert!(decode_varint(&buf).is_err());
    }

    #[test]
    fn cursor_helpers_write_and_read_in_sequence() {
        let mut cursor = ByteCursor::new();
        let after_first = write_varint(&mut cursor, -3);
        assert_eq!(after_first, 1);
        write_varint(&mut cursor, 1_000_000);
        write_varint(&mut cursor, i64::MIN);

        let bytes = cursor.into_bytes();
        let mut reader = ByteCursor::wrap(&bytes[..]);
        assert_eq!(read_varint(&mut reader).unwrap(), -3);
        assert_eq!(read_varint(&mut reader).unwrap(), 1_000_000);
        assert_eq!(read_varint(&mut reader).unwrap(), i64::MIN);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn read_varint_i32_rejects_wide_values() {
        let mut cursor = ByteCursor::new();
        write_varint(&mut cursor, i64::from(i32::MAX) + 1);
        let bytes = cursor.into_bytes();
        let mut reader = ByteCursor::wrap(&bytes[..]);
        assert!(read_varint_i32(&mut reader).is_err());
    }

    #[test]
    fn read_varint_len_rejects_negative_and_oversized() {
        let mut cursor = ByteCursor::new();
        write_varint(&mut cursor, -1);
        let bytes = cursor.into_bytes();
        assert!(read_varint_len(&mut ByteCursor::wrap(&bytes[..])).is_err());

        let mut cursor = ByteCursor::new();
        write_varint(&mut cursor, 5);
        cursor.write_bytes(b"abc");
        let bytes = cursor.into_bytes();
        assert!(read_varint_len(&mut ByteCursor::wrap(&bytes[..])).is_err());
    }
}
