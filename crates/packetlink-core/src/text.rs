//! Text codec — byte buffers to strings, total and stateless.

use std::borrow::Cow;

/// Interpret a byte buffer as UTF-8 text.
///
/// Never fails: malformed sequences become U+FFFD replacement characters,
/// and the empty buffer decodes to the empty string. Valid UTF-8 passes
/// through unchanged.
pub fn decode_as_text(buf: &[u8]) -> String {
    match String::from_utf8_lossy(buf) {
        Cow::Borrowed(s) => s.to_owned(),
        Cow::Owned(s) => s,
    }
}
