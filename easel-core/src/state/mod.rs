//! # State
//!
//! The mutable document state: the ordered, layered element sequence and the
//! grouping machinery built on top of it.

pub mod document;
pub mod grouping;

pub use document::{DocumentId, ReconstructError, SceneDocument};
