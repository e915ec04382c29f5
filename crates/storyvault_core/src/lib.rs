//! Core domain logic for StoryVault.
//! This crate is the single source of truth for record invariants and
//! on-disk layout.

pub mod config;
pub mod history;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{default_data_dir, prepare_data_dir};
pub use history::graph_history::{GraphHistory, HISTORY_CAPACITY};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError, LoggingStatus};
pub use model::graph::{GraphData, GraphEdge, GraphNode, GraphValidationError, NodeKind, Position};
pub use model::note::{derive_preview, normalize_tag, normalize_tags, Note, NoteValidationError};
pub use model::project::ProjectMetadata;
pub use model::settings::{Settings, SettingsPatch, SettingsValidationError, Theme};
pub use repo::graph_repo::GraphRepository;
pub use repo::note_repo::NoteRepository;
pub use repo::project_repo::ProjectRepository;
pub use repo::settings_repo::SettingsRepository;
pub use service::autosave::{Debouncer, SAVE_DEBOUNCE};
pub use service::graph_service::{GraphService, GraphServiceError};
pub use service::note_service::{NoteService, NoteServiceError, NoteSummary};
pub use service::settings_service::{SettingsService, SettingsServiceError};
pub use store::{
    ChangeKind, FileStore, RecordValidationError, StoreChange, StoreEntity, StoreError,
    StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
