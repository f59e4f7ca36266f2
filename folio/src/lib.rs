//! Schema-driven immutable document model with a transactional transform
//! engine.
//!
//! This umbrella crate re-exports the full public API of
//! [`folio_model`] (schemas, nodes, fragments, marks, positions, slices,
//! and the replace kernel) and [`folio_transform`] (steps, position maps,
//! the replace fitter, and the [`Transform`] builder).
#![warn(clippy::all, clippy::pedantic)]

pub use folio_model::{
    text_length, Attrs, ChildInfo, ContentMatch, DiffEnd, Fragment, Index, JsonError, Mark,
    MarkSpec, MarkType, MatchEdge, Node, NodeRange, NodeSpec, NodeType, PositionError,
    ReplaceError, ResolvedPos, Schema, SchemaError, SchemaSpec, Slice, Whitespace,
};
pub use folio_model::{AttributeSpec, error as model_error};

pub use folio_transform::{
    can_change_type, can_join, can_split, drop_point, find_wrapping, insert_point, join_point,
    lift_target, replace_step, AddMarkStep, AddNodeMarkStep, AttrStep, DocAttrStep, MapResult,
    Mappable, Mapping, Recover, RemoveMarkStep, RemoveNodeMarkStep, ReplaceAroundStep,
    ReplaceStep, Step, StepError, StepJsonError, StepMap, StepResult, Transform, TransformError,
    TypeAndAttrs,
};
