//! Steps that update attributes on a single node or on the document root.

use serde_json::{Map, Value};

use folio_model::{Attrs, Fragment, Node, Schema, Slice};

use crate::error::{StepError, StepJsonError};
use crate::map::Mappable;
use crate::step::{from_replace, read_usize, StepResult};

fn read_attr_fields(
    obj: &Map<String, Value>,
    what: &'static str,
) -> Result<(String, Value), StepJsonError> {
    let attr = obj
        .get("attr")
        .and_then(Value::as_str)
        .ok_or(StepJsonError::Invalid(what))?;
    let value = obj.get("value").cloned().unwrap_or(Value::Null);
    Ok((attr.to_owned(), value))
}

/// Update an attribute in a specific node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrStep {
    pos: usize,
    attr: String,
    value: Value,
}

impl AttrStep {
    /// Construct an attribute step.
    pub fn new(pos: usize, attr: impl Into<String>, value: Value) -> AttrStep {
        AttrStep {
            pos,
            attr: attr.into(),
            value,
        }
    }

    /// The position of the target node.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The attribute to set.
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// The attribute's new value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let Some(node) = doc.node_at(self.pos) else {
            return Err(StepError::NoNodeAtAttrPos);
        };
        let mut attrs: Attrs = node.attrs().clone();
        attrs.insert(self.attr.clone(), self.value.clone());
        let updated = node
            .node_type()
            .create(Some(&attrs), None, Some(node.marks().to_vec()))?;
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

    pub(crate) fn invert(&self, doc: &Node) -> AttrStep {
        let node = doc
            .node_at(self.pos)
            .expect("inverting against the step's own document");
        AttrStep::new(
            self.pos,
            self.attr.clone(),
            node.attrs().get(&self.attr).cloned().unwrap_or(Value::Null),
        )
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<AttrStep> {
        let pos = mapping.map_result(self.pos, 1);
        if pos.deleted_after() {
            None
        } else {
            Some(AttrStep::new(pos.pos(), self.attr.clone(), self.value.clone()))
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("attr"));
        obj.insert("pos".to_owned(), Value::from(self.pos));
        obj.insert("attr".to_owned(), Value::from(self.attr.clone()));
        obj.insert("value".to_owned(), self.value.clone());
        Value::Object(obj)
    }

    pub(crate) fn from_json(_schema: &Schema, value: &Value) -> Result<AttrStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("AttrStep.from_json"))?;
        let (attr, val) = read_attr_fields(obj, "AttrStep.from_json")?;
        Ok(AttrStep::new(
            read_usize(obj, "pos", "AttrStep.from_json")?,
            attr,
            val,
        ))
    }
}

/// Update an attribute in the doc node.
#[derive(Debug, Clone, PartialEq)]
pub struct DocAttrStep {
    attr: String,
    value: Value,
}

impl DocAttrStep {
    /// Construct a document-attribute step.
    pub fn new(attr: impl Into<String>, value: Value) -> DocAttrStep {
        DocAttrStep {
            attr: attr.into(),
            value,
        }
    }

    /// The attribute to set.
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// The attribute's new value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn apply(&self, doc: &Node) -> StepResult {
        let mut attrs: Attrs = doc.attrs().clone();
        attrs.insert(self.attr.clone(), self.value.clone());
        Ok(doc.node_type().create(
            Some(&attrs),
            Some(doc.content().clone()),
            Some(doc.marks().to_vec()),
        )?)
    }

    pub(crate) fn invert(&self, doc: &Node) -> DocAttrStep {
        DocAttrStep::new(
            self.attr.clone(),
            doc.attrs().get(&self.attr).cloned().unwrap_or(Value::Null),
        )
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("stepType".to_owned(), Value::from("docAttr"));
        obj.insert("attr".to_owned(), Value::from(self.attr.clone()));
        obj.insert("value".to_owned(), self.value.clone());
        Value::Object(obj)
    }

    pub(crate) fn from_json(_schema: &Schema, value: &Value) -> Result<DocAttrStep, StepJsonError> {
        let obj = value
            .as_object()
            .ok_or(StepJsonError::Invalid("DocAttrStep.from_json"))?;
        let (attr, val) = read_attr_fields(obj, "DocAttrStep.from_json")?;
        Ok(DocAttrStep::new(attr, val))
    }
}
