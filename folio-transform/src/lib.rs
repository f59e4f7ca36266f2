//! Invertible, mappable document transforms.
//!
//! This crate builds on [`folio_model`] and implements the step algebra:
//! atomic, invertible document changes ([`Step`]) whose positional effects
//! are described by [`StepMap`]s and composed into [`Mapping`]s, plus the
//! high-level [`Transform`] builder with the slice-fitting `replace`
//! machinery and structural editing helpers.
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

pub mod attr_step;
pub mod error;
pub mod map;
pub mod mark_step;
pub mod replace;
pub mod replace_step;
pub mod step;
pub mod structure;
pub mod transform;

pub use attr_step::{AttrStep, DocAttrStep};
pub use error::{StepError, StepJsonError, TransformError};
pub use map::{MapResult, Mappable, Mapping, Recover, StepMap};
pub use mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
pub use replace::replace_step;
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use step::{Step, StepResult};
pub use structure::{
    can_change_type, can_join, can_split, drop_point, find_wrapping, insert_point, join_point,
    lift_target, TypeAndAttrs,
};
pub use transform::Transform;
