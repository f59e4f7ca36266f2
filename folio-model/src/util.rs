//! String-length arithmetic in UTF-16 code units.
//!
//! Positions inside text nodes count UTF-16 code units, so code points
//! outside the basic multilingual plane occupy two positions.

use once_cell::sync::Lazy;

use crate::Attrs;

/// Shared empty attribute map, used wherever a node or mark has no
/// attributes of its own.
pub(crate) static EMPTY_ATTRS: Lazy<Attrs> = Lazy::new(Attrs::new);

/// The length of `text` in UTF-16 code units.
pub fn text_length(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Translates a UTF-16 code-unit offset into a byte offset into `text`.
///
/// Offsets past the end of the string saturate to its byte length. An offset
/// landing between the two units of a surrogate pair resolves to the start of
/// that code point; positions produced by this crate never land there.
pub(crate) fn byte_offset(text: &str, utf16_offset: usize) -> usize {
    if utf16_offset == 0 {
        return 0;
    }
    let mut units = 0;
    for (bytes, ch) in text.char_indices() {
        if units >= utf16_offset {
            return bytes;
        }
        units += ch.len_utf16();
    }
    text.len()
}

/// The substring of `text` between two UTF-16 code-unit offsets.
pub(crate) fn slice_utf16(text: &str, from: usize, to: usize) -> &str {
    if to <= from {
        return "";
    }
    &text[byte_offset(text, from)..byte_offset(text, to)]
}
