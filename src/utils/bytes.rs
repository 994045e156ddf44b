//! Byte-slice utilities for bounds-oriented parsing.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): zero-cost helpers that return `Option<T>`.
//! - **Result layer** (`*_r`): wrappers that map `None` to `DecodeError::InsufficientData`.
//!
//! Endianness is chosen by the caller through `byteorder::ByteOrder`; templates describe
//! big-endian (classic Mac) data by default but nothing here assumes it.

use byteorder::ByteOrder;

use crate::err::DecodeError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a `width`-byte unsigned integer (1..=8) at `offset`.
pub(crate) fn read_uint<B: ByteOrder>(buf: &[u8], offset: usize, width: usize) -> Option<u64> {
    let end = offset.checked_add(width)?;
    let bytes = buf.get(offset..end)?;
    Some(B::read_uint(bytes, width))
}

/// Read a `width`-byte two's complement integer (1..=8) at `offset`.
pub(crate) fn read_int<B: ByteOrder>(buf: &[u8], offset: usize, width: usize) -> Option<i64> {
    let end = offset.checked_add(width)?;
    let bytes = buf.get(offset..end)?;
    Some(B::read_int(bytes, width))
}

#[inline]
pub(crate) fn insufficient(
    what: &'static str,
    offset: usize,
    need: usize,
    len: usize,
) -> DecodeError {
    DecodeError::InsufficientData {
        what,
        offset: offset as u64,
        need,
        have: len.saturating_sub(offset),
    }
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| insufficient(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| insufficient(what, offset, len, buf.len()))
}

/// Read `N` raw bytes at `offset`, or return `DecodeError::InsufficientData`.
pub(crate) fn read_array_r<const N: usize>(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<[u8; N], DecodeError> {
    read_array::<N>(buf, offset).ok_or_else(|| insufficient(what, offset, N, buf.len()))
}

pub(crate) fn read_uint_r<B: ByteOrder>(
    buf: &[u8],
    offset: usize,
    width: usize,
    what: &'static str,
) -> Result<u64, DecodeError> {
    read_uint::<B>(buf, offset, width).ok_or_else(|| insufficient(what, offset, width, buf.len()))
}

pub(crate) fn read_int_r<B: ByteOrder>(
    buf: &[u8],
    offset: usize,
    width: usize,
    what: &'static str,
) -> Result<i64, DecodeError> {
    read_int::<B>(buf, offset, width).ok_or_else(|| insufficient(what, offset, width, buf.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn test_reads_respect_byte_order() {
        let buf = [0x00, 0x02, 0xff, 0xfe];
        assert_eq!(read_uint::<BigEndian>(&buf, 0, 2), Some(2));
        assert_eq!(read_uint::<LittleEndian>(&buf, 0, 2), Some(0x0200));
        assert_eq!(read_int::<BigEndian>(&buf, 2, 2), Some(-2));
        assert_eq!(read_uint::<BigEndian>(&buf, 3, 2), None);
    }

    #[test]
    fn test_slice_r_reports_missing_bytes() {
        let err = slice_r(&[1, 2, 3], 2, 4, "blob").unwrap_err();
        match err {
            DecodeError::InsufficientData {
                what,
                offset,
                need,
                have,
            } => {
                assert_eq!(what, "blob");
                assert_eq!(offset, 2);
                assert_eq!(need, 4);
                assert_eq!(have, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
