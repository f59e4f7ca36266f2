//! Computing the differing range between two fragments.

use crate::fragment::Fragment;
use crate::util::text_length;

/// End positions of the differing range in two fragments, as returned by
/// [`Fragment::find_diff_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEnd {
    /// Position in the first fragment.
    pub a: usize,
    /// Position in the second fragment.
    pub b: usize,
}

pub(crate) fn find_diff_start(a: &Fragment, b: &Fragment, pos: usize) -> Option<usize> {
    let mut pos = pos;
    let mut i = 0;
    loop {
        if a.child_count() == i || b.child_count() == i {
            return if a.child_count() == b.child_count() {
                None
            } else {
                Some(pos)
            };
        }
        let (child_a, child_b) = (a.child(i), b.child(i));
        if child_a.ptr_eq(child_b) {
            pos += child_a.node_size();
            i += 1;
            continue;
        }
        if !child_a.same_markup(child_b) {
            return Some(pos);
        }
        if child_a.is_text() && child_a.text() != child_b.text() {
            let (text_a, text_b) = (child_a.text(), child_b.text());
            if text_b.starts_with(text_a) {
                return Some(pos + text_length(text_a));
            }
            if text_a.starts_with(text_b) {
                return Some(pos + text_length(text_b));
            }
            let mut offset = 0;
            for (ca, cb) in text_a.chars().zip(text_b.chars()) {
                if ca != cb {
                    return Some(pos + offset);
                }
                offset += ca.len_utf16();
            }
        }
        if child_a.content().size() > 0 || child_b.content().size() > 0 {
            if let Some(inner) = find_diff_start(child_a.content(), child_b.content(), pos + 1) {
                return Some(inner);
            }
        }
        pos += child_a.node_size();
        i += 1;
    }
}

pub(crate) fn find_diff_end(
    a: &Fragment,
    b: &Fragment,
    pos_a: usize,
    pos_b: usize,
) -> Option<DiffEnd> {
    let (mut i_a, mut i_b) = (a.child_count(), b.child_count());
    let (mut pos_a, mut pos_b) = (pos_a, pos_b);
    loop {
        if i_a == 0 || i_b == 0 {
            return if i_a == i_b {
                None
            } else {
                Some(DiffEnd { a: pos_a, b: pos_b })
            };
        }
        i_a -= 1;
        i_b -= 1;
        let (child_a, child_b) = (a.child(i_a), b.child(i_b));
        let size = child_a.node_size();
        if child_a.ptr_eq(child_b) {
            pos_a -= size;
            pos_b -= size;
            continue;
        }
        if !child_a.same_markup(child_b) {
            return Some(DiffEnd { a: pos_a, b: pos_b });
        }
        if child_a.is_text() && child_a.text() != child_b.text() {
            for (ca, cb) in child_a.text().chars().rev().zip(child_b.text().chars().rev()) {
                if ca != cb {
                    break;
                }
                pos_a -= ca.len_utf16();
                pos_b -= ca.len_utf16();
            }
            return Some(DiffEnd { a: pos_a, b: pos_b });
        }
        if child_a.content().size() > 0 || child_b.content().size() > 0 {
            if let Some(inner) =
                find_diff_end(child_a.content(), child_b.content(), pos_a - 1, pos_b - 1)
            {
                return Some(inner);
            }
        }
        pos_a -= size;
        pos_b -= size;
    }
}
