//! Minimal UTF-8 decode/encode helpers for the character-position string
//! operations.
//!
//! Decoding follows a truncation policy: a NUL byte, the end of the buffer, or
//! the first malformed sequence all decode as code point `0`, which callers
//! treat as end of string.

/// Replacement for code points that cannot be encoded.
pub const REPLACEMENT: u32 = 0xFFFD;

/// Decodes the code point starting at `*pos` and advances `*pos` past it.
///
/// Returns `0` without advancing at the end of `buf`, at a NUL byte, or at a
/// malformed sequence.
pub fn decode_next(buf: &[u8], pos: &mut usize) -> u32 {
    let Some(&lead) = buf.get(*pos) else {
        return 0;
    };

    let width = match lead {
        0x00 => return 0,
        0x01..=0x7F => {
            *pos += 1;
            return lead as u32;
        }
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return 0,
    };

    let Some(seq) = buf.get(*pos..*pos + width) else {
        return 0;
    };

    // `from_utf8` rejects overlongs, surrogates and out-of-range values.
    match core::str::from_utf8(seq).ok().and_then(|s| s.chars().next()) {
        Some(ch) => {
            *pos += width;
            ch as u32
        }
        None => 0,
    }
}

/// Encodes `code_point` as UTF-8 into `out`, returning the number of bytes
/// written. Surrogates and values above `U+10FFFF` encode as U+FFFD.
pub fn encode(code_point: u32, out: &mut [u8; 4]) -> usize {
    let ch = char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER);
    ch.encode_utf8(out).len()
}

/// Counts the code points in `buf` up to the first terminator.
pub fn char_count(buf: &[u8]) -> usize {
    let mut pos = 0;
    let mut count = 0;
    while decode_next(buf, &mut pos) != 0 {
        count += 1;
    }
    count
}

/// Byte offset of character `index`, or the offset where decoding stopped if
/// the buffer holds fewer characters.
pub fn byte_offset(buf: &[u8], index: usize) -> usize {
    let mut pos = 0;
    for _ in 0..index {
        if decode_next(buf, &mut pos) == 0 {
            break;
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mixed_widths() {
        let text = "aé€😀";
        let buf = text.as_bytes();
        let mut pos = 0;
        assert_eq!(decode_next(buf, &mut pos), 'a' as u32);
        assert_eq!(decode_next(buf, &mut pos), 'é' as u32);
        assert_eq!(decode_next(buf, &mut pos), '€' as u32);
        assert_eq!(decode_next(buf, &mut pos), '😀' as u32);
        assert_eq!(pos, buf.len());
        assert_eq!(decode_next(buf, &mut pos), 0);
    }

    #[test]
    fn malformed_input_truncates() {
        let buf = [b'a', b'b', 0xC3, b'c', b'd'];
        assert_eq!(char_count(&buf), 2);

        let overlong = [b'x', 0xC0, 0x80];
        assert_eq!(char_count(&overlong), 1);

        let cut_short = [b'x', 0xE2, 0x82];
        assert_eq!(char_count(&cut_short), 1);
    }

    #[test]
    fn nul_terminates() {
        assert_eq!(char_count(b"ab\0cd"), 2);
    }

    #[test]
    fn encode_widths() {
        let mut out = [0u8; 4];
        assert_eq!(encode('A' as u32, &mut out), 1);
        assert_eq!(encode(0x416, &mut out), 2);
        assert_eq!(&out[..2], "Ж".as_bytes());
        assert_eq!(encode(0x20AC, &mut out), 3);
        assert_eq!(encode(0x1F600, &mut out), 4);

        assert_eq!(encode(0xD800, &mut out), 3);
        assert_eq!(&out[..3], "\u{FFFD}".as_bytes());
    }

    #[test]
    fn byte_offsets_follow_characters() {
        let buf = "añb".as_bytes();
        assert_eq!(byte_offset(buf, 0), 0);
        assert_eq!(byte_offset(buf, 1), 1);
        assert_eq!(byte_offset(buf, 2), 3);
        assert_eq!(byte_offset(buf, 3), 4);
        assert_eq!(byte_offset(buf, 10), 4);
    }
}
