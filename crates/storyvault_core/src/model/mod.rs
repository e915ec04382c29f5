//! Schema/type layer for every persisted record.
//!
//! # Responsibility
//! - Define the shapes of notes, the worldbuilding graph, settings and
//!   project metadata.
//! - Provide `validate()` checks run at every read/write boundary.
//!
//! # Invariants
//! - Wire field names are camelCase, matching files written by the UI.
//! - No cross-record consistency is enforced here.

pub mod graph;
pub mod note;
pub mod project;
pub mod settings;
