use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::bytes;

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`: the data is already in memory
/// and reads report `DeserializationError::Truncated` with the offset they failed at.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub(crate) fn u8_named(&mut self, what: &'static str) -> DeserializationResult<u8> {
        let v = bytes::read_u8_r(self.buf, self.pos, what)?;
        self.pos += 1;
        Ok(v)
    }

    #[inline]
    pub(crate) fn i8_named(&mut self, what: &'static str) -> DeserializationResult<i8> {
        Ok(self.u8_named(what)? as i8)
    }

    #[inline]
    pub(crate) fn take_bytes(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> DeserializationResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    /// Reads a length that was decoded as a signed integer, rejecting negative values.
    pub(crate) fn take_len_prefixed(
        &mut self,
        len: i64,
        what: &'static str,
    ) -> DeserializationResult<&'a [u8]> {
        let len = usize::try_from(len).map_err(|_| DeserializationError::NegativeLength {
            what,
            length: len,
            offset: self.position(),
        })?;
        self.take_bytes(len, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_and_reports_offsets() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.u8_named("first").unwrap(), 1);
        assert_eq!(cursor.take_bytes(2, "rest").unwrap(), &[2, 3]);
        assert_eq!(cursor.remaining(), 0);

        let err = cursor.u8_named("past end").unwrap_err();
        assert!(matches!(
            err,
            DeserializationError::Truncated { offset: 3, .. }
        ));
    }

    #[test]
    fn rejects_negative_lengths() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.take_len_prefixed(-1, "string"),
            Err(DeserializationError::NegativeLength { length: -1, .. })
        ));
    }
}
