//! Directory watching for changes made outside the app.
//!
//! # Responsibility
//! - Translate raw OS notifications into store-level change events.
//! - Filter out dotfiles and in-flight temp files.
//!
//! # Invariants
//! - Coalescing is left to the OS watch mechanism; one raw event may map
//!   to several `StoreChange` values (one per path).
//! - No merge or conflict detection happens here: consumers re-read.

use super::{
    GRAPH_DIR, GRAPH_FILE, NOTES_DIR, PROJECT_FILE, RECORD_EXTENSION, SETTINGS_FILE, TEMP_SUFFIX,
};
use log::{debug, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }
}

/// Which record a changed path belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum StoreEntity {
    Note(String),
    Graph,
    Project,
    Settings,
    Other,
}

/// One change observed under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub entity: StoreEntity,
}

/// Maps a path below `base` to the record it stores.
pub fn classify_path(base: &Path, path: &Path) -> StoreEntity {
    let Ok(relative) = path.strip_prefix(base) else {
        return StoreEntity::Other;
    };
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(value) => value.to_str(),
            _ => None,
        })
        .collect();

    match parts.as_slice() {
        [file] if *file == PROJECT_FILE => StoreEntity::Project,
        [file] if *file == SETTINGS_FILE => StoreEntity::Settings,
        [dir, file] if *dir == GRAPH_DIR && *file == GRAPH_FILE => StoreEntity::Graph,
        [dir, file] if *dir == NOTES_DIR => Path::new(file)
            .extension()
            .filter(|ext| *ext == RECORD_EXTENSION)
            .and_then(|_| Path::new(file).file_stem())
            .and_then(|stem| stem.to_str())
            .map(|stem| StoreEntity::Note(stem.to_string()))
            .unwrap_or(StoreEntity::Other),
        _ => StoreEntity::Other,
    }
}

/// Returns whether changes to `path` are hidden from consumers.
pub fn is_ignored_path(base: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let hidden = relative.components().any(|component| match component {
        Component::Normal(value) => value.to_string_lossy().starts_with('.'),
        _ => false,
    });
    let in_flight = path
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX))
        .unwrap_or(false);
    hidden || in_flight
}

/// Converts a raw notify event into store changes.
pub fn changes_from_event(base: &Path, event: &Event) -> Vec<StoreChange> {
    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .iter()
        .filter(|path| !is_ignored_path(base, path))
        .map(|path| StoreChange {
            kind,
            path: path.clone(),
            entity: classify_path(base, path),
        })
        .collect()
}

/// Starts a recursive watcher on `base` that forwards changes to `on_change`.
///
/// The returned watcher stops when dropped.
pub(crate) fn start_watcher<F>(base: &Path, on_change: F) -> notify::Result<RecommendedWatcher>
where
    F: Fn(StoreChange) + Send + 'static,
{
    // Some backends report resolved paths, others echo the watched path.
    let requested = base.to_path_buf();
    let resolved = base.canonicalize().unwrap_or_else(|_| requested.clone());
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let root = if event.paths.iter().any(|path| path.starts_with(&resolved)) {
                    &resolved
                } else {
                    &requested
                };
                for change in changes_from_event(root, &event) {
                    debug!(
                        "event=fs_change module=watch kind={} path={}",
                        change.kind.as_str(),
                        change.path.display()
                    );
                    on_change(change);
                }
            }
            Err(err) => {
                warn!("event=fs_change module=watch status=error error={err}");
            }
        },
        Config::default(),
    )?;
    watcher.watch(base, RecursiveMode::Recursive)?;
    Ok(watcher)
}
