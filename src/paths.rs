//! Path Utilities - String Algebra for Derived Filenames
//!
//! Pure functions over `&str`. Nothing here touches the filesystem.

use std::ops::Range;

/// True when `s` ends with `suffix`
pub fn ends_with(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len() && s.ends_with(suffix)
}

/// Byte offset of the last `/`, or 0 when there is none
pub fn dir_len(s: &str) -> usize {
    s.rfind('/').unwrap_or(0)
}

/// Directory portion of `s`, without the trailing separator
pub fn dirname(s: &str) -> &str {
    &s[..dir_len(s)]
}

/// First byte offset of `needle` within `haystack`
pub fn find(haystack: &str, needle: &str) -> Option<usize> {
    haystack.find(needle)
}

/// Remove exactly `n` trailing bytes.
///
/// Returns `None` if `s` is shorter than `n` or the cut would split a
/// multi-byte character.
pub fn strip_suffix_n(s: &str, n: usize) -> Option<&str> {
    let end = s.len().checked_sub(n)?;
    if s.is_char_boundary(end) {
        Some(&s[..end])
    } else {
        None
    }
}

/// Copy of `s` with the byte range removed
pub fn splice_out(s: &str, range: Range<usize>) -> String {
    let mut out = String::with_capacity(s.len() - range.len());
    out.push_str(&s[..range.start]);
    out.push_str(&s[range.end..]);
    out
}
