//! Schema-driven immutable document model.
//!
//! Documents are persistent trees of typed [`Node`]s carrying inline
//! [`Mark`]s, validated against a declarative [`Schema`] whose content
//! expressions are compiled to DFAs ([`ContentMatch`]). Positions are
//! integers counting one token per node boundary and one per UTF-16 code
//! unit of text; [`ResolvedPos`] decomposes a position along the tree spine.
//! [`Slice`]s represent open-ended subtrees cut from a document, and the
//! replace kernel splices them back in while preserving schema validity.
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

pub mod content;
pub mod diff;
pub mod error;
pub mod fragment;
pub mod mark;
pub mod node;
pub mod replace;
pub mod resolved_pos;
pub mod schema;
pub mod slice;
pub(crate) mod util;

pub use content::{ContentMatch, MatchEdge};
pub use diff::DiffEnd;
pub use error::{JsonError, PositionError, ReplaceError, SchemaError};
pub use fragment::{Fragment, Index};
pub use mark::Mark;
pub use node::{ChildInfo, Node};
pub use resolved_pos::{NodeRange, ResolvedPos};
pub use schema::{
    AttributeSpec, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec, Whitespace,
};
pub use slice::Slice;
pub use util::text_length;

/// Attribute mapping attached to nodes and marks.
pub type Attrs = serde_json::Map<String, serde_json::Value>;
