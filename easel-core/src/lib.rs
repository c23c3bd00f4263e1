//! # easel-core
//!
//! The scene-manipulation engine of a layered 2D vector-drawing surface: the
//! document/element data model, the unit/pixel transform pipeline, the
//! selection and pointer-interaction state machine, z-order and grouping
//! commands, bounded undo/redo history, and the boolean combine engine.
//!
//! Rendering, windowing, and file formats live outside this crate, behind the
//! narrow contracts in [`element`] (paint hook) and [`interact`] (external
//! draw collaborator).

pub mod combine;
pub mod element;
pub mod history;
pub mod id;
pub mod interact;
pub mod session;
pub mod state;
pub mod units;

use id::FuzzID;
