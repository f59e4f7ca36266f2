//! Open-ended pieces cut from a document.

use std::fmt;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::error::{JsonError, ReplaceError};
use crate::fragment::{Fragment, Index};
use crate::node::Node;
use crate::schema::Schema;

static EMPTY: Lazy<Slice> = Lazy::new(|| Slice::new(Fragment::empty(), 0, 0));

/// A slice represents a piece cut out of a larger document. It stores not
/// only a fragment, but also the depth up to which nodes on both sides are
/// "open" (cut through): their boundary tokens are absent, so the slice can
/// fuse with compatible content when it is inserted.
#[derive(Clone, PartialEq, Eq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    /// Create a slice. When specifying a non-zero open depth, you must make
    /// sure that there are nodes of at least that depth at the appropriate
    /// side of the fragment.
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    /// The shared empty slice.
    pub fn empty() -> Slice {
        EMPTY.clone()
    }

    /// The slice's content.
    pub fn content(&self) -> &Fragment {
        &self.content
    }

    /// The open depth at the start of the fragment.
    pub fn open_start(&self) -> usize {
        self.open_start
    }

    /// The open depth at the end.
    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// The size a slice would add when inserted into a document.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    /// Insert the given fragment at `pos` inside the slice's content,
    /// returning `None` when it does not fit there.
    pub fn insert_at(&self, pos: usize, fragment: Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the content between the two positions (relative to the
    /// slice's exterior coordinate space).
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
        Ok(Slice::new(
            remove_range(&self.content, from + self.open_start, to + self.open_start)?,
            self.open_start,
            self.open_end,
        ))
    }

    /// Create a slice from a fragment, opening both sides as deep as
    /// possible. When `open_isolating` is false, isolating nodes stop the
    /// descent.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let mut open_start = 0;
        let mut n = fragment.first_child().cloned();
        while let Some(node) = n {
            if node.is_leaf() || !(open_isolating || !node.node_type().spec().isolating) {
                break;
            }
            open_start += 1;
            n = node.first_child().cloned();
        }
        let mut open_end = 0;
        let mut n = fragment.last_child().cloned();
        while let Some(node) = n {
            if node.is_leaf() || !(open_isolating || !node.node_type().spec().isolating) {
                break;
            }
            open_end += 1;
            n = node.last_child().cloned();
        }
        Slice::new(fragment, open_start, open_end)
    }

    /// The JSON representation of this slice; `null` when it is empty.
    pub fn to_json(&self) -> Value {
        if self.content.size() == 0 {
            return Value::Null;
        }
        let mut obj = Map::new();
        obj.insert("content".to_owned(), self.content.to_json());
        if self.open_start > 0 {
            obj.insert("openStart".to_owned(), Value::from(self.open_start));
        }
        if self.open_end > 0 {
            obj.insert("openEnd".to_owned(), Value::from(self.open_end));
        }
        Value::Object(obj)
    }

    /// Deserialize a slice from its JSON representation. Absent input or
    /// JSON `null` produce the empty slice.
    pub fn from_json(schema: &Schema, value: Option<&Value>) -> Result<Slice, JsonError> {
        let Some(value) = value else {
            return Ok(Slice::empty());
        };
        match value {
            Value::Null => Ok(Slice::empty()),
            Value::Object(obj) => {
                let read_open = |key: &str| -> Result<usize, JsonError> {
                    match obj.get(key) {
                        None | Some(Value::Null) => Ok(0),
                        Some(v) => v
                            .as_u64()
                            .map(|n| n as usize)
                            .ok_or(JsonError::Invalid("Slice.from_json")),
                    }
                };
                Ok(Slice::new(
                    Fragment::from_json(schema, obj.get("content"))?,
                    read_open("openStart")?,
                    read_open("openEnd")?,
                ))
            }
            _ => Err(JsonError::Invalid("Slice.from_json")),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.content, self.open_start, self.open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Slice {self}>")
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let Index { index, offset } = content.find_index(dist).ok()?;
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(Node::is_text) {
        if let Some(parent) = parent {
            if !parent.can_replace(index, index, Some(&insert)) {
                return None;
            }
        }
        return Some(content.cut(0, dist).append(&insert).append(&content.cut_from(dist)));
    }
    let child = child.expect("offset != dist implies a child at index");
    let inner = insert_into(child.content(), dist - offset - 1, insert, None)?;
    Some(content.replace_child(index, child.copy(inner)))
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
    let Index { index, offset } = content.find_index(from)?;
    let child = content.maybe_child(index);
    let Index {
        index: index_to,
        offset: offset_to,
    } = content.find_index(to)?;
    if offset == from || child.is_some_and(Node::is_text) {
        if offset_to != to && !content.child(index_to).is_text() {
            return Err(ReplaceError::NonFlatRange);
        }
        return Ok(content.cut(0, from).append(&content.cut_from(to)));
    }
    let child = child.expect("offset != from implies a child at index");
    if index != index_to {
        return Err(ReplaceError::NonFlatRange);
    }
    Ok(content.replace_child(
        index,
        child.copy(remove_range(
            child.content(),
            from - offset - 1,
            to - offset - 1,
        )?),
    ))
}
