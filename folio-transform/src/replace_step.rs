//! Replace and replace-around steps.

use serde_json::{Map, Value};

use folio_model::{Node, Schema, Slice};

use crate::error::{StepError, StepJsonError};
use crate::map::{Mappable, StepMap};
use crate::step::{from_replace, read_usize, StepResult};

/// Replace a part of the document with a slice of new content.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    from: usize,
    to: usize,
    slice: Slice,
    structure: bool,
}

impl ReplaceStep {
    /// The given slice should fit the 'gap' between `from` and `to` — the
    /// depths must line up, and the surrounding nodes must be able to be
    /// joined with the open sides of the slice. When `structure` is true,
    /// the step will fail if the content between `from` and `to` is not
    /// just a sequence of closing and opening tokens (this is only needed
    /// for composition over unreliable changes).
    pub fn new(from: usize, to: usize, slice: Slice, structure: bool) -> ReplaceStep {
        ReplaceStep {
            from,
            to,
            slice,
            structure,
        }
    }

    /// The start position of the replaced range.
    pub fn from(&self) -> usize {
        self.from
    }

    /// The end position of the replaced range.
    pub fn to(&self) -> usize {
        self.to
    }

    /// The slice to insert.
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    /// Whether this is a structural step.
    pub fn structure(&self) -> bool {
        self.structure
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        if self.structure && content_between(doc, self.from, self.to)? {
            return Err(StepError::WouldOverwriteContent);
        }
        from_replace(doc, self.from, self.to, &self.slice)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::new(vec![self.from, self.to - self.from, self.slice.size()])
    }

    pub(crate) fn invert(&self, doc: &Node) -> ReplaceStep {
        ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            doc.slice(self.from, self.to)
                .expect("inverting against the step's own document"),
            false,
        )
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<ReplaceStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if from.deleted() && to.deleted() {
            return None;
        }
        Some(ReplaceStep::new(
            from.pos(),
            from.pos().max(to.pos()),
            self.slice.clone(),
            false,
        ))
    }

    pub(crate) fn merge(&self, other: &ReplaceStep) -> Option<ReplaceStep> {
        if other.structure || self.structure {
            return None;
        }
        if self.from + self.slice.size() == other.from
            && self.slice.open_end() == 0
            && other.slice.open_start() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::empty()
            } else {
                Slice::new(
                    self.slice.content().append(other.slice.content()),
                    self.slice.open_start(),
                    other.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(
                self.from,
                self.to + (other.to - other.from),
                slice,
                self.structure,
            ))
        } else if other.to == self.from
            && self.slice.open_start() == 0
            && other.slice.open_end() == 0
        {
            let slice = if self.slice.size() + other.slice.size() == 0 {
                Slice::empty()
            } else {
                Slice::new(
                    other.slice.content().append(self.slice.content()),
                    other.slice.open_start(),
                    self.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(other.from, self.to, slice, self.structure))
        } else {
            None
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("replace"));
        obj.insert("from".to_owned(), Value::from(self.from));
        obj.insert("to".to_owned(), Value::from(self.to));
        if self.slice.size() > 0 {
            obj.insert("slice".to_owned(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".to_owned(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub(crate) fn from_json(schema: &Schema, value: &Value) -> Result<ReplaceStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("ReplaceStep.from_json"))?;
        Ok(ReplaceStep::new(
            read_usize(obj, "from", "ReplaceStep.from_json")?,
            read_usize(obj, "to", "ReplaceStep.from_json")?,
            Slice::from_json(schema, obj.get("slice"))?,
            obj.get("structure").and_then(Value::as_bool).unwrap_or(false),
        ))
    }
}

/// Replace a part of the document with a slice of content, but preserve a
/// range of the replaced content by moving it into the slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    from: usize,
    to: usize,
    gap_from: usize,
    gap_to: usize,
    slice: Slice,
    insert: usize,
    structure: bool,
}

impl ReplaceAroundStep {
    /// Create a replace-around step with the given range and gap.
    /// `insert` should be the point in the slice into which the content of
    /// the gap should be moved. `structure` has the same meaning as it has
    /// in the [`ReplaceStep`] constructor.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    ) -> ReplaceAroundStep {
        ReplaceAroundStep {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure,
        }
    }

    /// The start position of the replaced range.
    pub fn from(&self) -> usize {
        self.from
    }

    /// The end position of the replaced range.
    pub fn to(&self) -> usize {
        self.to
    }

    /// The start of preserved range.
    pub fn gap_from(&self) -> usize {
        self.gap_from
    }

    /// The end of preserved range.
    pub fn gap_to(&self) -> usize {
        self.gap_to
    }

    /// The slice to insert.
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    /// The position in the slice where the preserved range should be
    /// inserted.
    pub fn insert(&self) -> usize {
        self.insert
    }

    /// Whether this is a structural step.
    pub fn structure(&self) -> bool {
        self.structure
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        if self.structure
            && (content_between(doc, self.from, self.gap_from)?
                || content_between(doc, self.gap_to, self.to)?)
        {
            return Err(StepError::GapWouldOverwriteContent);
        }
        let gap = doc.slice(self.gap_from, self.gap_to)?;
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return Err(StepError::GapNotFlat);
        }
        let Some(inserted) = self.slice.insert_at(self.insert, gap.content().clone()) else {
            return Err(StepError::GapContentDoesNotFit);
        };
        from_replace(doc, self.from, self.to, &inserted)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            self.from,
            self.gap_from - self.from,
            self.insert,
            self.gap_to,
            self.to - self.gap_to,
            self.slice.size() - self.insert,
        ])
    }

    pub(crate) fn invert(&self, doc: &Node) -> ReplaceAroundStep {
        let gap = self.gap_to - self.gap_from;
        ReplaceAroundStep::new(
            self.from,
            self.from + self.slice.size() + gap,
            self.from + self.insert,
            self.from + self.insert + gap,
            doc.slice(self.from, self.to)
                .expect("inverting against the step's own document")
                .remove_between(self.gap_from - self.from, self.gap_to - self.from)
                .expect("gap is a flat range of the replaced slice"),
            self.gap_from - self.from,
            self.structure,
        )
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<ReplaceAroundStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        let gap_from = mapping.map(self.gap_from, -1);
        let gap_to = mapping.map(self.gap_to, 1);
        if (from.deleted() && to.deleted()) || gap_from < from.pos() || gap_to > to.pos() {
            return None;
        }
        Some(ReplaceAroundStep::new(
            from.pos(),
            to.pos(),
            gap_from,
            gap_to,
            self.slice.clone(),
            self.insert,
            self.structure,
        ))
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("replaceAround"));
        obj.insert("from".to_owned(), Value::from(self.from));
        obj.insert("to".to_owned(), Value::from(self.to));
        obj.insert("gapFrom".to_owned(), Value::from(self.gap_from));
        obj.insert("gapTo".to_owned(), Value::from(self.gap_to));
        obj.insert("insert".to_owned(), Value::from(self.insert));
        if self.slice.size() > 0 {
            obj.insert("slice".to_owned(), self.slice.to_json());
        }
        if self.structure {
            obj.insert("structure".to_owned(), Value::Bool(true));
        }
        Value::Object(obj)
    }

    pub(crate) fn from_json(
        schema: &Schema,
        value: &Value,
    ) -> Result<ReplaceAroundStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("ReplaceAroundStep.from_json"))?;
        Ok(ReplaceAroundStep::new(
            read_usize(obj, "from", "ReplaceAroundStep.from_json")?,
            read_usize(obj, "to", "ReplaceAroundStep.from_json")?,
            read_usize(obj, "gapFrom", "ReplaceAroundStep.from_json")?,
            read_usize(obj, "gapTo", "ReplaceAroundStep.from_json")?,
            Slice::from_json(schema, obj.get("slice"))?,
            read_usize(obj, "insert", "ReplaceAroundStep.from_json")?,
            obj.get("structure").and_then(Value::as_bool).unwrap_or(false),
        ))
    }
}

/// Tells whether there is any non-boundary content between the two
/// positions, which a structural step must refuse to overwrite.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
    let rp_from = doc.resolve(from)?;
    let mut dist = to - from;
    let mut depth = rp_from.depth();
    while dist > 0
        && depth > 0
        && rp_from.index_after(depth) == rp_from.node(depth).child_count()
    {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rp_from
            .node(depth)
            .maybe_child(rp_from.index_after(depth))
            .cloned();
        while dist > 0 {
            let Some(node) = next else { return Ok(true) };
            if node.is_leaf() {
                return Ok(true);
            }
            next = node.first_child().cloned();
            dist -= 1;
        }
    }
    Ok(false)
}
