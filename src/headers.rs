//! Byte-level helpers for case-insensitive header handling.
//!
//! The tokenizer recognises `Content-Length` and `Transfer-Encoding` on its
//! own; these helpers cover the lookups done after a request is complete,
//! notably the `Connection` handling for keep-alive detection.

/// Case-insensitive equality for header names. Exact length, ASCII folding.
#[inline]
pub fn name_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.eq_ignore_ascii_case(b)
}

/// Does a `Connection` header value mean `close`?
///
/// Header values keep their trailing whitespace in the token, so this
/// tolerates surrounding space/tab/CR/LF around the directive.
#[inline]
pub fn is_close(val: &[u8]) -> bool {
    if val.len() < "close".len() {
        return false;
    }
    let mut iter = val.iter();
    for (idx, &ch) in iter.by_ref().enumerate() {
        match ch {
            b'\r' | b'\n' | b' ' | b'\t' => continue,
            b'c' | b'C' => {
                if idx + "close".len() > val.len() {
                    return false;
                }
                break;
            }
            _ => return false,
        }
    }
    for (idx, ch) in iter.by_ref().take(4).enumerate() {
        if b"lose"[idx] != ch.to_ascii_lowercase() {
            return false;
        }
    }
    for &ch in iter {
        match ch {
            b'\r' | b'\n' | b' ' | b'\t' => continue,
            _ => return false,
        }
    }
    true
}
