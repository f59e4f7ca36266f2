//! Inline annotations attached to nodes.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::JsonError;
use crate::schema::{MarkType, Schema};
use crate::Attrs;

/// A mark is a piece of information that can be attached to a node, such as
/// it being emphasized, in code font, or a link. It has a type and
/// optionally a set of attributes that provide further information (such as
/// the target of the link). Marks are created through a `Schema`, which
/// controls which marks exist and which attributes they have.
#[derive(Clone)]
pub struct Mark {
    mark_type: MarkType,
    attrs: Arc<Attrs>,
}

impl Mark {
    pub(crate) fn new(mark_type: MarkType, attrs: Arc<Attrs>) -> Self {
        Mark { mark_type, attrs }
    }

    /// The type of this mark.
    pub fn mark_type(&self) -> &MarkType {
        &self.mark_type
    }

    /// The attributes associated with this mark.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Given a set of marks, create a new set which contains this one as
    /// well, in the right position. If this mark is already in the set, the
    /// set itself is returned. If any marks that are set to be
    /// [exclusive](crate::schema::MarkSpec::excludes) with this mark are
    /// present, those are replaced by this one.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.mark_type.excludes(&other.mark_type) {
                copy.get_or_insert_with(|| set[0..i].to_vec());
            } else if other.mark_type.excludes(&self.mark_type) {
                return set.to_vec();
            } else {
                if !placed && other.mark_type.rank() > self.mark_type.rank() {
                    let copy = copy.get_or_insert_with(|| set[0..i].to_vec());
                    copy.push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    /// Remove this mark from the given set, returning a new set. If this
    /// mark is not in the set, the set itself is returned.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|item| *item != self).cloned().collect()
    }

    /// Test whether this mark is in the given set of marks.
    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|item| item == self)
    }

    /// Test whether two sets of marks are identical.
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
    }

    /// Create a properly sorted mark set from an unordered collection.
    pub fn set_from(marks: impl IntoIterator<Item = Mark>) -> Vec<Mark> {
        let mut set: Vec<Mark> = marks.into_iter().collect();
        set.sort_by_key(|item| item.mark_type.rank());
        set
    }

    /// The JSON representation of this mark.
    pub fn to_json(&self) -> Value {
        json!({ "type": self.mark_type.name(), "attrs": Value::Object((*self.attrs).clone()) })
    }

    /// Deserialize a mark from its JSON representation.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Mark, JsonError> {
        let obj = value.as_object().ok_or(JsonError::Invalid("Mark.from_json"))?;
        let name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(JsonError::Invalid("Mark.from_json"))?;
        let mark_type = schema
            .mark_type(name)
            .ok_or_else(|| JsonError::UnknownMarkType(name.to_owned()))?;
        let attrs = obj.get("attrs").and_then(Value::as_object);
        Ok(mark_type.create(attrs)?)
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.mark_type == other.mark_type && *self.attrs == *other.attrs
    }
}

impl Eq for Mark {}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mark_type.name())?;
        if !self.attrs.is_empty() {
            write!(f, "({:?})", self.attrs)?;
        }
        Ok(())
    }
}
