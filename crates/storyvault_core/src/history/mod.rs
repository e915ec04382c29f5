//! Client-side edit history.
//!
//! # Responsibility
//! - Keep bounded whole-state snapshots of the worldbuilding graph so the
//!   canvas can undo and redo.
//!
//! # Invariants
//! - History is linear: recording after an undo drops the redo tail.
//! - Snapshots are restored verbatim; there is no diffing or merging.

pub mod graph_history;
