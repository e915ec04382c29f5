//! Local JSON file store.
//!
//! # Responsibility
//! - Map every record to a path under one base directory.
//! - Write records atomically and validate them on the way in and out.
//! - Watch the base directory for changes made by other programs.
//!
//! # Invariants
//! - A record is trusted only after it deserializes and passes `validate()`.
//! - Writers never leave a partially written target file behind.
//! - No transaction spans more than one record.
//!
//! Layout:
//! ```text
//! <base>/notes/<id>.json
//! <base>/graph/nodes.json
//! <base>/project.json
//! <base>/settings.json
//! ```

use crate::model::graph::GraphValidationError;
use crate::model::note::NoteValidationError;
use crate::model::project::ProjectValidationError;
use crate::model::settings::SettingsValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod atomic;
mod file_store;
pub mod watch;

pub use atomic::{temp_path_for, write_json_atomic, TEMP_SUFFIX};
pub use file_store::FileStore;
pub use watch::{ChangeKind, StoreChange, StoreEntity};

pub const NOTES_DIR: &str = "notes";
pub const GRAPH_DIR: &str = "graph";
pub const GRAPH_FILE: &str = "nodes.json";
pub const PROJECT_FILE: &str = "project.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const RECORD_EXTENSION: &str = "json";

pub type StoreResult<T> = Result<T, StoreError>;

/// Record-level validation failure, tagged by record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    Note(NoteValidationError),
    Graph(GraphValidationError),
    Settings(SettingsValidationError),
    Project(ProjectValidationError),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note(err) => write!(f, "{err}"),
            Self::Graph(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Project(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecordValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Note(err) => Some(err),
            Self::Graph(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Project(err) => Some(err),
        }
    }
}

impl From<NoteValidationError> for RecordValidationError {
    fn from(value: NoteValidationError) -> Self {
        Self::Note(value)
    }
}

impl From<GraphValidationError> for RecordValidationError {
    fn from(value: GraphValidationError) -> Self {
        Self::Graph(value)
    }
}

impl From<SettingsValidationError> for RecordValidationError {
    fn from(value: SettingsValidationError) -> Self {
        Self::Settings(value)
    }
}

impl From<ProjectValidationError> for RecordValidationError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Project(value)
    }
}

/// File store error.
#[derive(Debug)]
pub enum StoreError {
    /// Target record file does not exist.
    NotFound(PathBuf),
    /// Filesystem failure on `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// File content is not JSON of the expected shape.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Value could not be serialized before writing.
    Serialize(serde_json::Error),
    /// Shape is fine but record invariants do not hold.
    Invalid {
        path: PathBuf,
        source: RecordValidationError,
    },
    /// Directory watcher setup failed.
    Watch(notify::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "malformed record {}: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to serialize record: {err}"),
            Self::Invalid { path, source } => {
                write!(f, "invalid record {}: {source}", path.display())
            }
            Self::Watch(err) => write!(f, "directory watch failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Invalid { source, .. } => Some(source),
            Self::Watch(err) => Some(err),
        }
    }
}

impl From<notify::Error> for StoreError {
    fn from(value: notify::Error) -> Self {
        Self::Watch(value)
    }
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short machine-readable class used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Serialize(_) => "serialize",
            Self::Invalid { .. } => "invalid",
            Self::Watch(_) => "watch",
        }
    }
}
