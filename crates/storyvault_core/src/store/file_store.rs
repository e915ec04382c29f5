//! Filesystem-backed store rooted at one base directory.

use super::atomic::write_json_atomic;
use super::watch::{start_watcher, StoreChange};
use super::{
    RecordValidationError, StoreError, StoreResult, GRAPH_DIR, GRAPH_FILE, NOTES_DIR,
    PROJECT_FILE, RECORD_EXTENSION, SETTINGS_FILE,
};
use log::{error, info};
use notify::RecommendedWatcher;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Local JSON store. One instance per open data directory.
///
/// Single writer by contract: the app is the only in-process writer, and
/// external edits are picked up through `watch`.
pub struct FileStore {
    base: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("base", &self.base)
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl FileStore {
    /// Opens a store rooted at `base`, creating `notes/` and `graph/`.
    ///
    /// Idempotent: existing directories and records are left alone.
    pub fn open(base: impl Into<PathBuf>) -> StoreResult<Self> {
        let base = base.into();
        for dir in [base.join(NOTES_DIR), base.join(GRAPH_DIR)] {
            std::fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        }
        info!(
            "event=store_open module=store status=ok base={}",
            base.display()
        );
        Ok(Self {
            base,
            watcher: None,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.base.join(NOTES_DIR)
    }

    /// Path of `notes/<id>.json`. Does not validate `id`.
    pub fn note_path(&self, id: &str) -> PathBuf {
        self.notes_dir().join(format!("{id}.{RECORD_EXTENSION}"))
    }

    pub fn graph_path(&self) -> PathBuf {
        self.base.join(GRAPH_DIR).join(GRAPH_FILE)
    }

    pub fn project_path(&self) -> PathBuf {
        self.base.join(PROJECT_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base.join(SETTINGS_FILE)
    }

    /// Reads `path` and trusts the value only after `validate` passes.
    ///
    /// Failures are logged here and returned to the caller.
    pub(crate) fn read_record<T, V>(&self, path: &Path, validate: V) -> StoreResult<T>
    where
        T: DeserializeOwned,
        V: FnOnce(&T) -> Result<(), RecordValidationError>,
    {
        let result = read_and_validate(path, validate);
        if let Err(err) = &result {
            error!(
                "event=record_read module=store status=error path={} error_kind={} error={}",
                path.display(),
                err.kind(),
                err
            );
        }
        result
    }

    /// Validates then atomically writes `value` to `path`.
    pub(crate) fn write_record<T>(
        &self,
        path: &Path,
        value: &T,
        validation: Result<(), RecordValidationError>,
    ) -> StoreResult<()>
    where
        T: Serialize,
    {
        if let Err(source) = validation {
            error!(
                "event=record_write module=store status=rejected path={} error={}",
                path.display(),
                source
            );
            return Err(StoreError::Invalid {
                path: path.to_path_buf(),
                source,
            });
        }
        write_json_atomic(path, value)
    }

    /// Starts watching the base directory, replacing any previous watcher.
    pub fn watch<F>(&mut self, on_change: F) -> StoreResult<()>
    where
        F: Fn(StoreChange) + Send + 'static,
    {
        self.close();
        let watcher = start_watcher(&self.base, on_change)?;
        self.watcher = Some(watcher);
        info!(
            "event=watch_start module=store status=ok base={}",
            self.base.display()
        );
        Ok(())
    }

    /// Stops the directory watcher if one is running.
    pub fn close(&mut self) {
        if self.watcher.take().is_some() {
            info!(
                "event=watch_stop module=store status=ok base={}",
                self.base.display()
            );
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

fn read_and_validate<T, V>(path: &Path, validate: V) -> StoreResult<T>
where
    T: DeserializeOwned,
    V: FnOnce(&T) -> Result<(), RecordValidationError>,
{
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
        _ => StoreError::io(path, err),
    })?;
    let value: T = serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&value).map_err(|source| StoreError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::FileStore;

    #[test]
    fn open_creates_layout_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.notes_dir().is_dir());
        assert!(store.graph_path().parent().unwrap().is_dir());

        std::fs::write(store.note_path("keep"), b"{}").unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(reopened.note_path("keep").exists());
    }

    #[test]
    fn paths_follow_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let base = store.base_dir().to_path_buf();
        assert_eq!(store.note_path("n1"), base.join("notes").join("n1.json"));
        assert_eq!(store.graph_path(), base.join("graph").join("nodes.json"));
        assert_eq!(store.project_path(), base.join("project.json"));
        assert_eq!(store.settings_path(), base.join("settings.json"));
    }
}
