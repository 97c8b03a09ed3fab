/// Reads a little-endian primitive from a `Read` source.
///
/// On failure the error is mapped to [`InvalidArchive::Truncated`](crate::err::InvalidArchive)
/// (for short reads) or an I/O error, capturing what was being read and where.
macro_rules! try_read {
    ($reader: expr, u8, $what: expr, $ctx: expr) => {
        $reader
            .read_u8()
            .map_err(|e| $ctx.read_error(e, $what))?
    };

    ($reader: expr, u32, $what: expr, $ctx: expr) => {
        $reader
            .read_u32::<byteorder::LittleEndian>()
            .map_err(|e| $ctx.read_error(e, $what))?
    };
}
