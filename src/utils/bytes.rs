//! Byte-slice utilities for bounds-oriented parsing.
//!
//! There are two layers:
//! - **Option layer** (`read_*`): helpers that return `Option<T>`, for callers that
//!   recover locally (e.g. table blobs that are allowed to be short).
//! - **Result layer** (`*_r`): wrappers that map `None` to `DeserializationError::Truncated`.
//!
//! All numeric reads are little-endian. Offsets are relative to the slice you pass in.

use crate::err::DeserializationError;

/// Read `N` raw bytes at `offset`.
///
/// Returns `None` if the range is out of bounds.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

/// Read a single byte at `offset`.
pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

/// Read an `i16` (little-endian) at `offset`.
pub(crate) fn read_i16_le(buf: &[u8], offset: usize) -> Option<i16> {
    Some(i16::from_le_bytes(read_array::<2>(buf, offset)?))
}

/// Read a `u32` (little-endian) at `offset`.
pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(read_array::<4>(buf, offset)?))
}

#[inline]
fn truncated(what: &'static str, offset: usize, need: usize, len: usize) -> DeserializationError {
    DeserializationError::Truncated {
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
) -> Result<&'a [u8], DeserializationError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| truncated(what, offset, len, buf.len()))
}

/// Read a single byte at `offset`, or return `DeserializationError::Truncated`.
pub(crate) fn read_u8_r(
    buf: &[u8],
    offset: usize,
    what: &'static str,
) -> Result<u8, DeserializationError> {
    read_u8(buf, offset).ok_or_else(|| truncated(what, offset, 1, buf.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0xFE, 0xFF];
        assert_eq!(read_u32_le(&buf, 0), Some(0x0403_0201));
        assert_eq!(read_i16_le(&buf, 4), Some(-2));
        assert_eq!(read_u32_le(&buf, 3), None);
    }

    #[test]
    fn result_layer_reports_truncation() {
        let buf = [0u8; 3];
        match slice_r(&buf, 2, 4, "table header") {
            Err(DeserializationError::Truncated {
                what, need, have, ..
            }) => {
                assert_eq!(what, "table header");
                assert_eq!(need, 4);
                assert_eq!(have, 1);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }
}
