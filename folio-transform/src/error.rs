//! Errors raised while applying steps and building transforms.

use folio_model::{PositionError, ReplaceError, SchemaError};
use thiserror::Error;

/// A step could not be applied to a document. Step application is
/// non-raising: this value is carried in the step's result and only turned
/// into a hard failure by [`Transform::step`](crate::Transform::step).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// A structural replace would have overwritten content.
    #[error("Structure replace would overwrite content")]
    WouldOverwriteContent,

    /// A structural gap-replace would have overwritten content.
    #[error("Structure gap-replace would overwrite content")]
    GapWouldOverwriteContent,

    /// The gap of a replace-around step was not a flat range.
    #[error("Gap is not a flat range")]
    GapNotFlat,

    /// The gap content of a replace-around step did not fit at the
    /// insertion point of its slice.
    #[error("Content does not fit in gap")]
    GapContentDoesNotFit,

    /// A node-mark step addressed a position with no node.
    #[error("No node at mark step's position")]
    NoNodeAtMarkPos,

    /// An attribute step addressed a position with no node.
    #[error("No node at attribute step's position")]
    NoNodeAtAttrPos,

    /// The underlying replace failed.
    #[error(transparent)]
    Replace(#[from] ReplaceError),

    /// A position used by the step lies outside the document.
    #[error(transparent)]
    Position(#[from] PositionError),

    /// Rebuilding a node for the step violated the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// An error thrown by [`Transform`](crate::Transform) methods when an edit
/// cannot be performed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// A step failed to apply.
    #[error(transparent)]
    Step(#[from] StepError),

    /// A position handed to the transform lies outside its document.
    #[error(transparent)]
    Position(#[from] PositionError),

    /// Node creation inside a structural edit violated the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The wrappers given to `wrap` do not form valid content for each
    /// other.
    #[error("Wrapper type given to wrap does not form valid content of its parent wrapper")]
    InvalidWrapContent,

    /// `set_block_type` was called with a node type that is not a
    /// textblock.
    #[error("Type given to set_block_type should be a textblock")]
    NotATextblock,

    /// A node's existing content is not valid for the type it is being
    /// changed to.
    #[error("Invalid content for node type {0}")]
    InvalidContent(String),

    /// No node exists at the addressed position.
    #[error("No node at position {0}")]
    NoNode(usize),
}

/// Malformed input handed to [`Step::from_json`](crate::Step::from_json).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepJsonError {
    /// A required field was missing or had the wrong shape.
    #[error("Invalid input for {0}")]
    Invalid(&'static str),

    /// The `stepType` field named an unregistered step kind.
    #[error("No step type {0} defined")]
    UnknownStepType(String),

    /// Embedded model data (slice, mark) failed to parse.
    #[error(transparent)]
    Model(#[from] folio_model::JsonError),
}
