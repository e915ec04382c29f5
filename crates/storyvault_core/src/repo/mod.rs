//! Repository contracts over the file store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per record type.
//! - Keep path and JSON details inside the store boundary.
//!
//! # Invariants
//! - Write paths validate records before persistence.
//! - Contracts are also implemented for `&T`, so several services can share
//!   one open store.

pub mod graph_repo;
pub mod note_repo;
pub mod project_repo;
pub mod settings_repo;
