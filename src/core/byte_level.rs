//! Byte-level base unit.
//!
//! Definitions whose `baseUnit` is `byteLevel` spell every UTF-8 byte as one
//! printable character, using the GPT-2 byte-to-unicode table:
//!
//! - Bytes 33-126, 161-172 and 174-255 map to the code point of equal value
//! - The remaining 68 bytes map to U+0100 onwards, in byte order
//!
//! So a space (0x20) becomes `Ġ` (U+0120). The mapping is bijective, which is
//! what lets decoding turn vocabulary strings back into the original bytes.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

static BYTE_TO_CHAR: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut mapping = ['\0'; 256];
    let mut next = 0x100u32;
    for b in 0u8..=255 {
        mapping[b as usize] = if maps_to_itself(b) {
            char::from(b)
        } else {
            let ch = char::from_u32(next).unwrap_or(char::REPLACEMENT_CHARACTER);
            next += 1;
            ch
        };
    }
    mapping
});

static CHAR_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_CHAR
        .iter()
        .enumerate()
        .map(|(byte, &ch)| (ch, byte as u8))
        .collect()
});

#[inline]
const fn maps_to_itself(b: u8) -> bool {
    matches!(b, 33..=126 | 161..=172 | 174..=255)
}

/// Character standing for `byte`.
#[inline]
pub fn byte_level_char(byte: u8) -> char {
    BYTE_TO_CHAR[byte as usize]
}

/// Whether `ch` belongs to the byte-level alphabet.
#[inline]
pub fn is_byte_level_char(ch: char) -> bool {
    CHAR_TO_BYTE.contains_key(&ch)
}

/// Spell raw bytes in the byte-level alphabet.
#[inline]
pub fn byte_level_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| byte_level_char(b)).collect()
}

/// Append the raw bytes spelled by `text` to `out`.
///
/// Returns `false`, leaving `out` partially extended, if `text` contains a
/// character outside the byte-level alphabet.
#[inline]
pub fn byte_level_decode_into(text: &str, out: &mut Vec<u8>) -> bool {
    for ch in text.chars() {
        match CHAR_TO_BYTE.get(&ch) {
            Some(&b) => out.push(b),
            None => return false,
        }
    }
    true
}

/// Turn a byte-level string back into raw bytes.
pub fn byte_level_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    byte_level_decode_into(text, &mut out).then_some(out)
}
