//! The step abstraction and JSON dispatch.

use serde_json::Value;

use folio_model::{Node, Schema, Slice};

use crate::attr_step::{AttrStep, DocAttrStep};
use crate::error::{StepError, StepJsonError};
use crate::map::{Mappable, StepMap};
use crate::mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};

/// The result of applying a step: the new document, or the reason the step
/// could not be applied. Step application never panics on malformed steps;
/// failures are values.
pub type StepResult = Result<Node, StepError>;

pub(crate) fn from_replace(doc: &Node, from: usize, to: usize, slice: &Slice) -> StepResult {
    Ok(doc.replace(from, to, slice)?)
}

/// A step object represents an atomic change. It generally applies only to
/// the document it was created for, since the positions stored in it will
/// only make sense for that document. Steps can be applied, inverted
/// against their input document, mapped through position mappings, merged
/// with adjacent steps, and round-tripped through JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace a range with a slice.
    Replace(ReplaceStep),
    /// Replace a range while preserving a gap inside it.
    ReplaceAround(ReplaceAroundStep),
    /// Add a mark to all inline content in a range.
    AddMark(AddMarkStep),
    /// Remove a mark from all inline content in a range.
    RemoveMark(RemoveMarkStep),
    /// Add a mark to a single node.
    AddNodeMark(AddNodeMarkStep),
    /// Remove a mark from a single node.
    RemoveNodeMark(RemoveNodeMarkStep),
    /// Set an attribute on a single node.
    Attr(AttrStep),
    /// Set an attribute on the document root.
    DocAttr(DocAttrStep),
}

impl Step {
    /// Applies this step to the given document, returning the resulting
    /// document or the reason application failed.
    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::ReplaceAround(step) => step.apply(doc),
            Step::AddMark(step) => step.apply(doc),
            Step::RemoveMark(step) => step.apply(doc),
            Step::AddNodeMark(step) => step.apply(doc),
            Step::RemoveNodeMark(step) => step.apply(doc),
            Step::Attr(step) => step.apply(doc),
            Step::DocAttr(step) => step.apply(doc),
        }
    }

    /// Get the step map that represents the changes made by this step.
    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => step.get_map(),
            Step::ReplaceAround(step) => step.get_map(),
            _ => StepMap::empty(),
        }
    }

    /// Create an inverted version of this step. Needs the document as it
    /// was before the step, i.e. the document the step was applied to.
    ///
    /// # Panics
    /// Panics when `doc` is not a document this step applies to.
    pub fn invert(&self, doc: &Node) -> Step {
        match self {
            Step::Replace(step) => step.invert(doc).into(),
            Step::ReplaceAround(step) => step.invert(doc).into(),
            Step::AddMark(step) => step.invert().into(),
            Step::RemoveMark(step) => step.invert().into(),
            Step::AddNodeMark(step) => step.invert(doc),
            Step::RemoveNodeMark(step) => step.invert(doc),
            Step::Attr(step) => step.invert(doc).into(),
            Step::DocAttr(step) => step.invert(doc).into(),
        }
    }

    /// Map this step through a mappable thing, returning either a version
    /// of that step with its positions adjusted, or `None` if the step was
    /// entirely deleted by the mapping.
    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        match self {
            Step::Replace(step) => step.map(mapping).map(Step::Replace),
            Step::ReplaceAround(step) => step.map(mapping).map(Step::ReplaceAround),
            Step::AddMark(step) => step.map(mapping).map(Step::AddMark),
            Step::RemoveMark(step) => step.map(mapping).map(Step::RemoveMark),
            Step::AddNodeMark(step) => step.map(mapping).map(Step::AddNodeMark),
            Step::RemoveNodeMark(step) => step.map(mapping).map(Step::RemoveNodeMark),
            Step::Attr(step) => step.map(mapping).map(Step::Attr),
            Step::DocAttr(step) => Some(Step::DocAttr(step.clone())),
        }
    }

    /// Try to merge this step with another one, to be applied directly
    /// after it. Returns the merged step when possible, `None` if the steps
    /// can't be merged.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => a.merge(b).map(Step::Replace),
            (Step::AddMark(a), Step::AddMark(b)) => a.merge(b).map(Step::AddMark),
            (Step::RemoveMark(a), Step::RemoveMark(b)) => a.merge(b).map(Step::RemoveMark),
            _ => None,
        }
    }

    /// The registered identifier of this step kind, as used in the
    /// `stepType` field of the JSON form.
    pub fn step_type(&self) -> &'static str {
        match self {
            Step::Replace(_) => "replace",
            Step::ReplaceAround(_) => "replaceAround",
            Step::AddMark(_) => "addMark",
            Step::RemoveMark(_) => "removeMark",
            Step::AddNodeMark(_) => "addNodeMark",
            Step::RemoveNodeMark(_) => "removeNodeMark",
            Step::Attr(_) => "attr",
            Step::DocAttr(_) => "docAttr",
        }
    }

    /// Create a JSON-serializable representation of this step.
    pub fn to_json(&self) -> Value {
        match self {
            Step::Replace(step) => step.to_json(),
            Step::ReplaceAround(step) => step.to_json(),
            Step::AddMark(step) => step.to_json(),
            Step::RemoveMark(step) => step.to_json(),
            Step::AddNodeMark(step) => step.to_json(),
            Step::RemoveNodeMark(step) => step.to_json(),
            Step::Attr(step) => step.to_json(),
            Step::DocAttr(step) => step.to_json(),
        }
    }

    /// Deserialize a step from its JSON representation, dispatching on its
    /// `stepType` field.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Step, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("Step.from_json"))?;
        let step_type = obj
            .get("stepType")
            .and_then(Value::as_str)
            .ok_or(StepJsonError::Invalid("Step.from_json"))?;
        match step_type {
            "replace" => Ok(ReplaceStep::from_json(schema, value)?.into()),
            "replaceAround" => Ok(ReplaceAroundStep::from_json(schema, value)?.into()),
            "addMark" => Ok(AddMarkStep::from_json(schema, value)?.into()),
            "removeMark" => Ok(RemoveMarkStep::from_json(schema, value)?.into()),
            "addNodeMark" => Ok(AddNodeMarkStep::from_json(schema, value)?.into()),
            "removeNodeMark" => Ok(RemoveNodeMarkStep::from_json(schema, value)?.into()),
            "attr" => Ok(AttrStep::from_json(schema, value)?.into()),
            "docAttr" => Ok(DocAttrStep::from_json(schema, value)?.into()),
            other => Err(StepJsonError::UnknownStepType(other.to_owned())),
        }
    }
}

macro_rules! step_from_impl {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Step {
            fn from(step: $ty) -> Step {
                Step::$variant(step)
            }
        })*
    };
}

step_from_impl! {
    Replace => ReplaceStep,
    ReplaceAround => ReplaceAroundStep,
    AddMark => AddMarkStep,
    RemoveMark => RemoveMarkStep,
    AddNodeMark => AddNodeMarkStep,
    RemoveNodeMark => RemoveNodeMarkStep,
    Attr => AttrStep,
    DocAttr => DocAttrStep,
}

pub(crate) fn read_usize(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    what: &'static str,
) -> Result<usize, StepJsonError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or(StepJsonError::Invalid(what))
}
