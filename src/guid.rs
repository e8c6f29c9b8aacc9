//! Compact element identifier codec
//!
//! The host model format identifies every building element by a 22-character
//! compact GUID drawn from a 64-symbol alphabet. The backing store and most
//! external systems use the canonical 36-character hyphenated UUID form of
//! the same 128-bit value. Both conversions are pure and never panic;
//! malformed input yields `None`.
//!
//! Bit layout: the first character carries 2 bits (alphabet index < 4), the
//! remaining 21 characters carry 6 bits each, for exactly 128 bits.

/// The 64-symbol encoding alphabet used by the host model format
const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Length of a compact identifier
const COMPACT_LEN: usize = 22;

/// Hex digits in a UUID once hyphens are stripped
const UUID_HEX_LEN: usize = 32;

/// Alphabet index of one symbol, or `None` if the byte is not in the alphabet
fn symbol_index(byte: u8) -> Option<u128> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u128),
        b'A'..=b'Z' => Some((byte - b'A') as u128 + 10),
        b'a'..=b'z' => Some((byte - b'a') as u128 + 36),
        b'_' => Some(62),
        b'$' => Some(63),
        _ => None,
    }
}

/// Convert a 22-character compact identifier to a hyphenated UUID string
///
/// Returns `None` if the input is not exactly 22 characters, contains a
/// character outside the alphabet, or its first character encodes more than
/// 2 bits. The result is lowercase `8-4-4-4-12` hex.
pub fn compact_to_uuid(compact: &str) -> Option<String> {
    let bytes = compact.as_bytes();
    if bytes.len() != COMPACT_LEN {
        return None;
    }

    // First symbol contributes the top 2 bits, so its index must fit in them.
    let first = symbol_index(bytes[0])?;
    if first > 3 {
        return None;
    }

    let mut value: u128 = first;
    for &byte in &bytes[1..] {
        value = (value << 6) | symbol_index(byte)?;
    }

    let hex = format!("{:032x}", value);
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// Convert a hyphenated (or bare) UUID string to its compact identifier
///
/// Hyphens are ignored wherever they appear; the remaining text must be
/// exactly 32 hex digits, case-insensitive. Returns `None` otherwise.
pub fn uuid_to_compact(uuid: &str) -> Option<String> {
    let mut value: u128 = 0;
    let mut digits = 0usize;

    for byte in uuid.bytes() {
        if byte == b'-' {
            continue;
        }
        let nibble = match byte {
            b'0'..=b'9' => (byte - b'0') as u128,
            b'a'..=b'f' => (byte - b'a') as u128 + 10,
            b'A'..=b'F' => (byte - b'A') as u128 + 10,
            _ => return None,
        };
        digits += 1;
        if digits > UUID_HEX_LEN {
            return None;
        }
        value = (value << 4) | nibble;
    }

    if digits != UUID_HEX_LEN {
        return None;
    }

    let mut out = Vec::with_capacity(COMPACT_LEN);
    // Top 2 bits first, then twenty-one 6-bit groups.
    out.push(ALPHABET[(value >> 126) as usize]);
    for group in 0..21 {
        let shift = 120 - 6 * group;
        out.push(ALPHABET[((value >> shift) & 0x3f) as usize]);
    }

    // The alphabet is ASCII, so this cannot fail.
    String::from_utf8(out).ok()
}
