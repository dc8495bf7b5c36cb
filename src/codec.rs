//! Session name encoding.
//!
//! Session names are chosen by humans and can contain anything, so they are
//! mapped onto a conservative opt-in alphabet before being used as file
//! names. Every byte outside `A-Z a-z 0-9 + - . _ @` is written as `%XX`
//! with uppercase hex digits.

/// Name used when the caller does not supply a session name.
pub const DEFAULT_SESSION: &str = "Default Settings";

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Returns true if `byte` is copied verbatim by [`encode`].
pub fn is_safe_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.' | b'_' | b'@')
}

/// Encode a session name into a token that is safe as a single path segment.
///
/// `None` encodes the same as [`DEFAULT_SESSION`].
pub fn encode(identifier: Option<&str>) -> String {
    let identifier = identifier.unwrap_or(DEFAULT_SESSION);
    let mut out = String::with_capacity(identifier.len() * 3);
    for &byte in identifier.as_bytes() {
        if is_safe_byte(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
    out
}

/// Decode a token produced by [`encode`].
///
/// Never fails. Escape digits are not validated: only uppercase hex decodes
/// meaningfully, anything else yields an unspecified byte. A `%` with fewer
/// than two bytes after it is copied through unchanged.
pub fn decode(token: &str) -> Vec<u8> {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = hex_digit(bytes[i + 1]);
            let lo = hex_digit(bytes[i + 2]);
            out.push(hi.wrapping_shl(4).wrapping_add(lo));
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// [`decode`] followed by a lossy UTF-8 conversion, for display and listing.
pub fn decode_lossy(token: &str) -> String {
    String::from_utf8_lossy(&decode(token)).into_owned()
}

fn hex_digit(byte: u8) -> u8 {
    let value = byte.wrapping_sub(b'0');
    if value > 9 { value.wrapping_sub(7) } else { value }
}
