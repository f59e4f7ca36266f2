//! Errors raised while building schemas, resolving positions, and splicing
//! content.

use thiserror::Error;

/// An error occurred while constructing a [`Schema`](crate::Schema) or while
/// creating content that violates it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A content expression failed to parse or compile.
    #[error("{message} (in content expression) \"{expression}\"")]
    ContentExpression {
        /// What went wrong.
        message: String,
        /// The offending expression, verbatim from the node spec.
        expression: String,
    },

    /// The `topNode` named by the spec does not exist.
    #[error("Schema is missing its top node type {0}")]
    MissingTopNode(String),

    /// Every schema must define a `text` node type.
    #[error("Every schema needs a 'text' type")]
    MissingTextType,

    /// The `text` node type must not declare attributes.
    #[error("The text node type should not have attributes")]
    TextTypeWithAttrs,

    /// A name was used for both a node type and a mark type.
    #[error("{0} can not be both a node and a mark")]
    NodeMarkCollision(String),

    /// A node type name was not found in the schema.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A mark name or group named in a spec was not found in the schema.
    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    /// A node or mark was created without a value for a required attribute.
    #[error("No value supplied for attribute {0}")]
    MissingAttr(String),

    /// `NodeType::create` was called on the text type.
    #[error("NodeType::create cannot construct text nodes")]
    TextNodeCreate,

    /// Content handed to `create_checked` does not match the type's
    /// content expression.
    #[error("Invalid content for node {0}")]
    InvalidContent(String),

    /// A node carries marks that are not a valid, sorted, exclusion-free set.
    #[error("Invalid collection of marks for node {node}: {marks:?}")]
    InvalidMarks {
        /// The node type name.
        node: String,
        /// The offending mark type names.
        marks: Vec<String>,
    },

    /// A node type belonging to a different schema was used.
    #[error("Node type from different schema used ({0})")]
    ForeignNodeType(String),
}

/// A position fell outside the tree it was used against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    /// The position lies outside the document.
    #[error("Position {pos} out of range")]
    OutOfRange {
        /// The offending position.
        pos: usize,
    },

    /// The position lies outside a fragment.
    #[error("Position {pos} outside of fragment")]
    OutsideFragment {
        /// The offending position.
        pos: usize,
    },
}

/// A slice could not be combined with the range it was spliced into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplaceError {
    /// The slice's `open_start` exceeds the depth of the insertion position.
    #[error("Inserted content deeper than insertion position")]
    InsertTooDeep,

    /// The open depths of the slice do not agree with the depths of the
    /// target range.
    #[error("Inconsistent open depths")]
    InconsistentOpenDepths,

    /// Two nodes along the seam have incompatible content.
    #[error("Cannot join {sub} onto {main}")]
    CannotJoin {
        /// Type name of the node being joined.
        sub: String,
        /// Type name of the node joined onto.
        main: String,
    },

    /// A rebuilt node ended up with content its type does not allow.
    #[error("Invalid content for node {0}")]
    InvalidContent(String),

    /// A removal range crossed a node boundary it does not fully contain.
    #[error("Removing non-flat range")]
    NonFlatRange,

    /// A position inside the splice failed to resolve.
    #[error(transparent)]
    Resolve(#[from] PositionError),
}

/// Malformed input handed to one of the `from_json` constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    /// A required field was missing or had the wrong shape.
    #[error("Invalid input for {0}")]
    Invalid(&'static str),

    /// The data referenced a mark type the schema does not define.
    #[error("There is no mark type {0} in this schema")]
    UnknownMarkType(String),

    /// The data referenced an unknown node type, or created invalid content.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
