//! Client-side state stores driven by the UI.
//!
//! # Responsibility
//! - Orchestrate repository calls into editor-level use-cases.
//! - Debounce saves so typing and dragging do not hit disk on every event.
//! - Keep UI/bridge layers decoupled from storage details.

pub mod autosave;
pub mod graph_service;
pub mod note_service;
pub mod settings_service;
