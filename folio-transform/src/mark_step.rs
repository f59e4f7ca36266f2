//! Steps that add and remove marks, on ranges and on single nodes.

use serde_json::{Map, Value};

use folio_model::{Fragment, Mark, Node, Schema, Slice};

use crate::error::{StepError, StepJsonError};
use crate::map::Mappable;
use crate::step::{from_replace, read_usize, Step, StepResult};

pub(crate) fn map_fragment(
    fragment: &Fragment,
    f: &dyn Fn(&Node, Option<&Node>, usize) -> Node,
    parent: Option<&Node>,
) -> Fragment {
    let mut mapped = Vec::new();
    for i in 0..fragment.child_count() {
        let mut child = fragment.child(i).clone();
        if child.content().size() > 0 {
            let inner = map_fragment(child.content(), f, Some(&child));
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent, i);
        }
        mapped.push(child);
    }
    Fragment::from_nodes(mapped)
}

fn read_mark(
    schema: &Schema,
    obj: &Map<String, Value>,
    what: &'static str,
) -> Result<Mark, StepJsonError> {
    let value = obj.get("mark").ok_or(StepJsonError::Invalid(what))?;
    Ok(Mark::from_json(schema, value)?)
}

/// Add a mark to all inline content between two positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    from: usize,
    to: usize,
    mark: Mark,
}

impl AddMarkStep {
    /// Create a mark step.
    pub fn new(from: usize, to: usize, mark: Mark) -> AddMarkStep {
        AddMarkStep { from, to, mark }
    }

    /// The start of the marked range.
    pub fn from(&self) -> usize {
        self.from
    }

    /// The end of the marked range.
    pub fn to(&self) -> usize {
        self.to
    }

    /// The mark to add.
    pub fn mark(&self) -> &Mark {
        &self.mark
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = doc.slice(self.from, self.to)?;
        let rp_from = doc.resolve(self.from)?;
        let parent = rp_from.node(rp_from.shared_depth(self.to)).clone();
        let content = map_fragment(
            old_slice.content(),
            &|node, parent, _i| {
                let Some(parent) = parent else {
                    return node.clone();
                };
                if !node.is_atom() || !parent.node_type().allows_mark_type(self.mark.mark_type()) {
                    return node.clone();
                }
                node.mark(self.mark.add_to_set(node.marks()))
            },
            Some(&parent),
        );
        let slice = Slice::new(content, old_slice.open_start(), old_slice.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }

    pub(crate) fn invert(&self) -> RemoveMarkStep {
        RemoveMarkStep::new(self.from, self.to, self.mark.clone())
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<AddMarkStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted() && to.deleted()) || from.pos() > to.pos() {
            return None;
        }
        Some(AddMarkStep::new(from.pos(), to.pos(), self.mark.clone()))
    }

    pub(crate) fn merge(&self, other: &AddMarkStep) -> Option<AddMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            return Some(AddMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ));
        }
        None
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("addMark"));
        obj.insert("mark".to_owned(), self.mark.to_json());
        obj.insert("from".to_owned(), Value::from(self.from));
        obj.insert("to".to_owned(), Value::from(self.to));
        Value::Object(obj)
    }

    pub(crate) fn from_json(schema: &Schema, value: &Value) -> Result<AddMarkStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("AddMarkStep.from_json"))?;
        Ok(AddMarkStep::new(
            read_usize(obj, "from", "AddMarkStep.from_json")?,
            read_usize(obj, "to", "AddMarkStep.from_json")?,
            read_mark(schema, obj, "AddMarkStep.from_json")?,
        ))
    }
}

/// Remove a mark from all inline content between two positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    from: usize,
    to: usize,
    mark: Mark,
}

impl RemoveMarkStep {
    /// Create a mark-removing step.
    pub fn new(from: usize, to: usize, mark: Mark) -> RemoveMarkStep {
        RemoveMarkStep { from, to, mark }
    }

    /// The start of the unmarked range.
    pub fn from(&self) -> usize {
        self.from
    }

    /// The end of the unmarked range.
    pub fn to(&self) -> usize {
        self.to
    }

    /// The mark to remove.
    pub fn mark(&self) -> &Mark {
        &self.mark
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let old_slice = doc.slice(self.from, self.to)?;
        let content = map_fragment(
            old_slice.content(),
            &|node, _parent, _i| node.mark(self.mark.remove_from_set(node.marks())),
            None,
        );
        let slice = Slice::new(content, old_slice.open_start(), old_slice.open_end());
        from_replace(doc, self.from, self.to, &slice)
    }

    pub(crate) fn invert(&self) -> AddMarkStep {
        AddMarkStep::new(self.from, self.to, self.mark.clone())
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<RemoveMarkStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if (from.deleted() && to.deleted()) || from.pos() > to.pos() {
            return None;
        }
        Some(RemoveMarkStep::new(from.pos(), to.pos(), self.mark.clone()))
    }

    pub(crate) fn merge(&self, other: &RemoveMarkStep) -> Option<RemoveMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            return Some(RemoveMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ));
        }
        None
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("removeMark"));
        obj.insert("mark".to_owned(), self.mark.to_json());
        obj.insert("from".to_owned(), Value::from(self.from));
        obj.insert("to".to_owned(), Value::from(self.to));
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        value: &Value,
    ) -> Result<RemoveMarkStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("RemoveMarkStep.from_json"))?;
        Ok(RemoveMarkStep::new(
            read_usize(obj, "from", "RemoveMarkStep.from_json")?,
            read_usize(obj, "to", "RemoveMarkStep.from_json")?,
            read_mark(schema, obj, "RemoveMarkStep.from_json")?,
        ))
    }
}

/// Add a mark to a specific node.
#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeMarkStep {
    pos: usize,
    mark: Mark,
}

impl AddNodeMarkStep {
    /// Create a node mark step.
    pub fn new(pos: usize, mark: Mark) -> AddNodeMarkStep {
        AddNodeMarkStep { pos, mark }
    }

    /// The position of the target node.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The mark to add.
    pub fn mark(&self) -> &Mark {
        &self.mark
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let Some(node) = doc.node_at(self.pos) else {
            return Err(StepError::NoNodeAtMarkPos);
        };
        let updated = node.node_type().create(
            Some(node.attrs()),
            None,
            Some(self.mark.add_to_set(node.marks())),
        )?;
        from_replace(
            doc,
            self.pos,
            self.pos + 1,
            &Slice::new(
                Fragment::from(updated),
                0,
                if node.is_leaf() { 0 } else { 1 },
            ),
        )
    }

    pub(crate) fn invert(&self, doc: &Node) -> Step {
        if let Some(node) = doc.node_at(self.pos) {
            let new_set = self.mark.add_to_set(node.marks());
            if new_set.len() == node.marks().len() {
                // Adding the mark replaced an excluded mark; the inverse
                // restores that one.
                for mark in node.marks() {
                    if !mark.is_in_set(&new_set) {
                        return AddNodeMarkStep::new(self.pos, mark.clone()).into();
                    }
                }
                return AddNodeMarkStep::new(self.pos, self.mark.clone()).into();
            }
        }
        RemoveNodeMarkStep::new(self.pos, self.mark.clone()).into()
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<AddNodeMarkStep> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(AddNodeMarkStep::new(pos.pos(), self.mark.clone()))
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("addNodeMark"));
        obj.insert("pos".to_owned(), Value::from(self.pos));
        obj.insert("mark".to_owned(), self.mark.to_json());
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        value: &Value,
    ) -> Result<AddNodeMarkStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("AddNodeMarkStep.from_json"))?;
        Ok(AddNodeMarkStep::new(
            read_usize(obj, "pos", "AddNodeMarkStep.from_json")?,
            read_mark(schema, obj, "AddNodeMarkStep.from_json")?,
        ))
    }
}

/// Remove a mark from a specific node.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveNodeMarkStep {
    pos: usize,
    mark: Mark,
}

impl RemoveNodeMarkStep {
    /// Create a mark-removing node step.
    pub fn new(pos: usize, mark: Mark) -> RemoveNodeMarkStep {
        RemoveNodeMarkStep { pos, mark }
    }

    /// The position of the target node.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The mark to remove.
    pub fn mark(&self) -> &Mark {
        &self.mark
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let Some(node) = doc.node_at(self.pos) else {
            return Err(StepError::NoNodeAtMarkPos);
        };
        let updated = node.node_type().create(
            Some(node.attrs()),
            None,
            Some(self.mark.remove_from_set(node.marks())),
        )?;
        from_replace(
            doc,
            self.pos,
            self.pos + 1,
            &Slice::new(
                Fragment::from(updated),
                0,
                if node.is_leaf() { 0 } else { 1 },
            ),
        )
    }

    pub(crate) fn invert(&self, doc: &Node) -> Step {
        match doc.node_at(self.pos) {
            Some(node) if self.mark.is_in_set(node.marks()) => {
                AddNodeMarkStep::new(self.pos, self.mark.clone()).into()
            }
            _ => self.clone().into(),
        }
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<RemoveNodeMarkStep> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(RemoveNodeMarkStep::new(pos.pos(), self.mark.clone()))
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("removeNodeMark"));
        obj.insert("pos".to_owned(), Value::from(self.pos));
        obj.insert("mark".to_owned(), self.mark.to_json());
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        value: &Value,
    ) -> Result<RemoveNodeMarkStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("RemoveNodeMarkStep.from_json"))?;
        Ok(RemoveNodeMarkStep::new(
            read_usize(obj, "pos", "RemoveNodeMarkStep.from_json")?,
            read_mark(schema, obj, "RemoveNodeMarkStep.from_json")?,
        ))
    }
}
