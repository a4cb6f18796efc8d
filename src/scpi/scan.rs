//! Text scanning helpers for handler arguments.
//!
//! All helpers work on raw bytes: the receive buffer is not required
//! to be valid UTF-8.

use crate::error::ErrorKind;

/// Argument separator.
#[inline]
pub fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Count leading spaces and tabs.
pub fn skip_spaces(input: &[u8]) -> usize {
    input.iter().take_while(|&&c| is_space(c)).count()
}

/// Check whether `input` starts with `prefix`, ignoring ASCII case.
pub fn has_prefix_ignore_case(input: &[u8], prefix: &str) -> bool {
    let prefix = prefix.as_bytes();
    input.len() >= prefix.len() && input[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Radix selected by a prefix letter.
fn prefix_radix(c: u8) -> Option<u32> {
    match c {
        b'x' | b'X' | b'h' | b'H' => Some(16),
        b'q' | b'Q' => Some(8),
        b'b' | b'B' => Some(2),
        _ => None,
    }
}

/// Read an unsigned number, optionally preceded by spaces, `#` and a radix
/// prefix (`x`/`h` hex, `q` octal, `b` binary). The prefix may also follow
/// a single leading zero, as in `0x2A`.
///
/// Returns the value and the number of bytes consumed (including the
/// skipped prefix). Fails with [`ErrorKind::Param`] when no digit is found
/// or the value does not fit in 32 bits.
pub fn scan_unsigned(input: &[u8]) -> Result<(u32, usize), ErrorKind> {
    try_scan_unsigned(input)?.ok_or(ErrorKind::Param)
}

/// Like [`scan_unsigned`], but a missing literal is `Ok(None)` so argument
/// lists can stop at the first non-number.
pub fn try_scan_unsigned(input: &[u8]) -> Result<Option<(u32, usize)>, ErrorKind> {
    let mut value: u32 = 0;
    let mut radix: u32 = 10;
    let mut prefixed = false;
    let mut digits = 0usize;
    let mut pos = 0usize;

    while let Some(&c) = input.get(pos) {
        if !prefixed {
            if digits == 0 && (is_space(c) || c == b'#') {
                pos += 1;
                continue;
            }
            // x2A, or 0x2A after a single leading zero
            if digits == 0 || (digits == 1 && value == 0) {
                if let Some(r) = prefix_radix(c) {
                    radix = r;
                    prefixed = true;
                    digits = 0;
                    pos += 1;
                    continue;
                }
            }
        }

        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 0xa,
            b'A'..=b'F' => c - b'A' + 0xA,
            _ => break,
        } as u32;
        if digit >= radix {
            break;
        }

        value = value
            .checked_mul(radix)
            .and_then(|v| v.checked_add(digit))
            .ok_or(ErrorKind::Param)?;
        digits += 1;
        pos += 1;
    }

    if digits == 0 {
        return Ok(None);
    }
    Ok(Some((value, pos)))
}
