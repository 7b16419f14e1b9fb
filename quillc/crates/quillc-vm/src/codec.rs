//! UTF-8 <-> UTF-32 codepoint codec.
//!
//! Strings inside the VM are stored as UTF-32 codepoint buffers (see
//! [`crate::value`]), but every external boundary - literals baked into a
//! program, bytes read by a native function, bytes written back out - is
//! UTF-8. This module is the only place that conversion happens.
//!
//! Invalid input bytes are handled according to an [`UnicodePolicy`]: fail
//! outright, replace with `U+FFFD`, or surrogate-escape the raw byte into
//! the codepoint range `U+DC80..=U+DCFF` so it round-trips back to the
//! exact original byte on re-encode. The surrogate range is otherwise
//! unobservable in well-formed UTF-8, which is what makes stealing it safe.

use crate::config::UnicodePolicy;

/// Lower bound of the surrogate-escape codepoint range.
pub const SURROGATE_ESCAPE_BASE: u32 = 0xDC80;
/// Upper bound (inclusive) of the surrogate-escape codepoint range.
pub const SURROGATE_ESCAPE_MAX: u32 = 0xDC80 + 0xFF;

/// Why a batch decode failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The input contained a byte sequence that isn't valid UTF-8, and the
    /// active policy was [`UnicodePolicy::Fail`].
    InvalidByte { offset: usize },
}

/// Returns the expected length in bytes (1-4) of a UTF-8 sequence given its
/// leading byte. Bytes that cannot start a sequence (continuation bytes,
/// `10xxxxxx`) are treated as length 1, matching how the interpreter's byte
/// scanner resyncs after an invalid sequence rather than reporting 0.
pub fn utf8_char_len(lead: u8) -> u8 {
    if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

fn is_utf8_start(c: u8) -> bool {
    c & 0xE0 == 0xC0 || c & 0xF0 == 0xE0 || c & 0xF8 == 0xF0
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Decodes one codepoint from the start of `bytes`.
///
/// Returns the codepoint and the number of bytes consumed, or `None` if the
/// leading byte does not start a valid, minimal, in-range UTF-8 sequence.
/// Rejects:
/// - truncated sequences (not enough bytes left)
/// - missing or malformed continuation bytes
/// - overlong encodings (a codepoint encoded with more bytes than required)
/// - the surrogate range `U+D800..=U+DFFF`, which UTF-8 must never encode
///
/// It also checks that the byte immediately following a multi-byte sequence
/// is not itself an unconsumed continuation byte, catching sequences like
/// a 2-byte lead followed by two continuation bytes where only one was
/// expected.
pub fn decode_one(bytes: &[u8]) -> Option<(u32, u8)> {
    let first = *bytes.first()?;
    if !is_utf8_start(first) {
        if first > 127 {
            return None;
        }
        return Some((first as u32, 1));
    }

    if first & 0xE0 == 0xC0 && bytes.len() >= 2 {
        let b1 = bytes[1];
        if !is_continuation(b1) {
            return None;
        }
        if bytes.len() >= 3 && is_continuation(bytes[2]) {
            return None;
        }
        let c = ((first as u32 & 0x1F) << 6) + (b1 as u32 & 0x3F);
        if c <= 127 {
            return None;
        }
        return Some((c, 2));
    }

    if first & 0xF0 == 0xE0 && bytes.len() >= 3 {
        let (b1, b2) = (bytes[1], bytes[2]);
        if !is_continuation(b1) || !is_continuation(b2) {
            return None;
        }
        if bytes.len() >= 4 && is_continuation(bytes[3]) {
            return None;
        }
        let c = ((first as u32 & 0x1F) << 12) + ((b1 as u32 & 0x3F) << 6) + (b2 as u32 & 0x3F);
        if c <= 0x7FF {
            return None;
        }
        if (0xD800..=0xDFFF).contains(&c) {
            return None;
        }
        return Some((c, 3));
    }

    if first & 0xF8 == 0xF0 && bytes.len() >= 4 {
        let (b1, b2, b3) = (bytes[1], bytes[2], bytes[3]);
        if !is_continuation(b1) || !is_continuation(b2) || !is_continuation(b3) {
            return None;
        }
        if bytes.len() >= 5 && is_continuation(bytes[4]) {
            return None;
        }
        let c = ((first as u32 & 0x1F) << 18)
            + ((b1 as u32 & 0x3F) << 12)
            + ((b2 as u32 & 0x3F) << 6)
            + (b3 as u32 & 0x3F);
        if c <= 0xFFFF {
            return None;
        }
        return Some((c, 4));
    }

    None
}

/// Encodes one codepoint as UTF-8 into `out`, returning the number of bytes
/// written, or `None` if `out` is too short.
///
/// If `surrogate_unescape` is set and `codepoint` falls in
/// `U+DC80..=U+DCFF`, writes the single original byte
/// `codepoint - 0xDC80` instead of a 2-byte UTF-8 sequence for it - the
/// inverse of the escape applied during decode.
pub fn encode_one(codepoint: u32, surrogate_unescape: bool, out: &mut [u8]) -> Option<u8> {
    if surrogate_unescape && (SURROGATE_ESCAPE_BASE..=SURROGATE_ESCAPE_MAX).contains(&codepoint) {
        *out.first_mut()? = (codepoint - SURROGATE_ESCAPE_BASE) as u8;
        return Some(1);
    }

    if codepoint < 0x80 {
        *out.first_mut()? = codepoint as u8;
        Some(1)
    } else if codepoint < 0x800 {
        if out.len() < 2 {
            return None;
        }
        out[0] = 0xC0 | ((codepoint >> 6) & 0x1F) as u8;
        out[1] = 0x80 | (codepoint & 0x3F) as u8;
        Some(2)
    } else if codepoint < 0x10000 {
        if out.len() < 3 {
            return None;
        }
        out[0] = 0xE0 | ((codepoint >> 12) & 0x0F) as u8;
        out[1] = 0x80 | ((codepoint >> 6) & 0x3F) as u8;
        out[2] = 0x80 | (codepoint & 0x3F) as u8;
        Some(3)
    } else if codepoint < 0x200000 {
        if out.len() < 4 {
            return None;
        }
        out[0] = 0xF0 | ((codepoint >> 18) & 0x07) as u8;
        out[1] = 0x80 | ((codepoint >> 12) & 0x3F) as u8;
        out[2] = 0x80 | ((codepoint >> 6) & 0x3F) as u8;
        out[3] = 0x80 | (codepoint & 0x3F) as u8;
        Some(4)
    } else {
        None
    }
}

/// Decodes a full UTF-8 byte slice into codepoints, handling invalid bytes
/// per `policy`.
///
/// With [`UnicodePolicy::Fail`], returns `Err` on the first invalid byte.
/// Otherwise every invalid byte is folded into exactly one output codepoint
/// (either `U+FFFD` or its surrogate-escape), and decoding continues.
pub fn utf8_to_utf32(input: &[u8], policy: UnicodePolicy) -> Result<Vec<u32>, DecodeError> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match decode_one(&input[i..]) {
            Some((c, consumed)) => {
                out.push(c);
                i += consumed as usize;
            }
            None => match policy {
                UnicodePolicy::Fail => return Err(DecodeError::InvalidByte { offset: i }),
                UnicodePolicy::ReplaceWithFffd => {
                    out.push(0xFFFD);
                    i += 1;
                }
                UnicodePolicy::SurrogateEscape => {
                    out.push(SURROGATE_ESCAPE_BASE + input[i] as u32);
                    i += 1;
                }
            },
        }
    }
    Ok(out)
}

/// Encodes a full codepoint sequence back to UTF-8. Surrogate-escaped
/// codepoints are unescaped back to their original raw byte, so
/// `utf32_to_utf8(utf8_to_utf32(bytes, SurrogateEscape)?) == bytes` for any
/// input, valid or not.
///
/// Returns `None` only if a codepoint is out of the representable range
/// (`>= 0x200000` and not a surrogate-escape byte); this cannot happen for
/// codepoints produced by [`utf8_to_utf32`].
pub fn utf32_to_utf8(input: &[u32]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut buf = [0u8; 4];
    for &c in input {
        let n = encode_one(c, true, &mut buf)?;
        out.extend_from_slice(&buf[..n as usize]);
    }
    Some(out)
}

/// Returns true if `c` is a Unicode combining mark that should fold into
/// the preceding base character when counting user-visible letters.
///
/// This is a range table over the combining-mark blocks rather than a full
/// Unicode category lookup: it covers the common combining diacritics,
/// Hebrew and Arabic points, Devanagari and related Indic marks, and the
/// general/supplemental combining-mark blocks. Codepoints outside these
/// ranges are always treated as their own letter, which undercounts
/// grapheme folding for scripts with combining marks outside these blocks
/// but matches the scope of what the interpreter needs letter counts for:
/// user-facing length/indexing of ordinary text.
fn is_combining_mark(c: u32) -> bool {
    matches!(c,
        0x0300..=0x036F   // Combining Diacritical Marks
        | 0x0483..=0x0489 // Cyrillic combining marks
        | 0x0591..=0x05BD // Hebrew points
        | 0x05BF | 0x05C1 | 0x05C2 | 0x05C4 | 0x05C5 | 0x05C7
        | 0x0610..=0x061A // Arabic marks
        | 0x064B..=0x065F
        | 0x0670
        | 0x06D6..=0x06DC
        | 0x06DF..=0x06E4
        | 0x06E7 | 0x06E8
        | 0x06EA..=0x06ED
        | 0x0E31 | 0x0E34..=0x0E3A | 0x0E47..=0x0E4E // Thai
        | 0x0900..=0x0903 | 0x093A..=0x094F | 0x0951..=0x0957 // Devanagari
        | 0x1AB0..=0x1AFF // Combining Diacritical Marks Extended
        | 0x1DC0..=0x1DFF // Combining Diacritical Marks Supplement
        | 0x20D0..=0x20FF // Combining Diacritical Marks for Symbols
        | 0xFE20..=0xFE2F // Combining Half Marks
    )
}

/// Counts the number of user-visible letters in a codepoint sequence,
/// folding combining marks into the preceding base codepoint.
///
/// A leading combining mark (no base to attach to) still counts as one
/// letter, matching how an empty string has zero letters but a lone
/// diacritic is not itself zero-width to the user.
pub fn letter_len(codepoints: &[u32]) -> usize {
    let mut count = 0usize;
    for (i, &c) in codepoints.iter().enumerate() {
        if i > 0 && is_combining_mark(c) {
            continue;
        }
        count += 1;
    }
    count
}

/// Returns the codepoint slice making up the `n`-th grapheme cluster
/// (1-based), or `None` if `n` is out of range. Used by `index-by-expr` on
/// strings, which indexes by letter rather than by codepoint.
pub fn nth_letter(codepoints: &[u32], n: usize) -> Option<&[u32]> {
    if n < 1 {
        return None;
    }
    let mut boundaries = Vec::new();
    for (i, &c) in codepoints.iter().enumerate() {
        if i == 0 || !is_combining_mark(c) {
            boundaries.push(i);
        }
    }
    let start = *boundaries.get(n - 1)?;
    let end = boundaries.get(n).copied().unwrap_or(codepoints.len());
    Some(&codepoints[start..end])
}
