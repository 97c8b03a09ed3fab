use encoding::all::{ISO_8859_1, WINDOWS_31J};
use encoding::{DecoderTrap, Encoding};

/// Decodes a legacy engine string.
///
/// Older projects were authored on Japanese Windows, so text that is not valid UTF-8 is
/// retried as Windows-31J (CP932) before falling back to ISO-8859-1, which accepts any byte.
pub fn decode_legacy_text(raw: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(raw) {
        return s.to_owned();
    }

    if let Ok(s) = WINDOWS_31J.decode(raw, DecoderTrap::Strict) {
        return s;
    }

    ISO_8859_1
        .decode(raw, DecoderTrap::Replace)
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
}
