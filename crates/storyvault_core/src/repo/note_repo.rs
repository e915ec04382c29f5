//! Note repository contract and file-store implementation.
//!
//! # Responsibility
//! - Provide note persistence APIs on top of `notes/<id>.json`.
//! - Keep one broken file from failing a whole listing.
//!
//! # Invariants
//! - Writes validate before touching disk.
//! - Reads fail on missing, malformed, or invalid files.
//! - `list_notes` logs and skips per-file failures.
//! - Listing order is `updated_at DESC, id ASC`.

use crate::model::note::{normalize_tags, validate_note_id, Note, NoteValidationError};
use crate::store::{FileStore, RecordValidationError, StoreError, StoreResult, RECORD_EXTENSION};
use log::{info, warn};
use std::io::ErrorKind;
use std::path::Path;

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Reads and validates one note by id.
    fn read_note(&self, id: &str) -> StoreResult<Note>;
    /// Validates then atomically writes one note (last write wins).
    fn write_note(&self, note: &Note) -> StoreResult<()>;
    /// Deletes one note. Deleting a missing note is not an error.
    fn delete_note(&self, id: &str) -> StoreResult<()>;
    /// Lists every readable note, skipping broken files.
    fn list_notes(&self) -> StoreResult<Vec<Note>>;

    /// Returns the normalized union of tags over all readable notes.
    fn list_tags(&self) -> StoreResult<Vec<String>> {
        let all = self
            .list_notes()?
            .into_iter()
            .flat_map(|note| note.tags)
            .collect::<Vec<_>>();
        Ok(normalize_tags(&all))
    }
}

impl<T: NoteRepository + ?Sized> NoteRepository for &T {
    fn read_note(&self, id: &str) -> StoreResult<Note> {
        (**self).read_note(id)
    }

    fn write_note(&self, note: &Note) -> StoreResult<()> {
        (**self).write_note(note)
    }

    fn delete_note(&self, id: &str) -> StoreResult<()> {
        (**self).delete_note(id)
    }

    fn list_notes(&self) -> StoreResult<Vec<Note>> {
        (**self).list_notes()
    }
}

impl NoteRepository for FileStore {
    fn read_note(&self, id: &str) -> StoreResult<Note> {
        checked_id(self, id)?;
        let path = self.note_path(id);
        self.read_record(&path, |note: &Note| {
            note.validate()?;
            if note.id != id {
                return Err(NoteValidationError::IdMismatch {
                    expected: id.to_string(),
                    found: note.id.clone(),
                }
                .into());
            }
            Ok(())
        })
    }

    fn write_note(&self, note: &Note) -> StoreResult<()> {
        // Reject the id before it is turned into a path.
        checked_id(self, &note.id)?;
        let path = self.note_path(&note.id);
        self.write_record(&path, note, note.validate().map_err(Into::into))
    }

    fn delete_note(&self, id: &str) -> StoreResult<()> {
        checked_id(self, id)?;
        let path = self.note_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("event=note_delete module=repo status=ok note_id={id}");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(&path, err)),
        }
    }

    fn list_notes(&self) -> StoreResult<Vec<Note>> {
        let dir = self.notes_dir();
        std::fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        let entries = std::fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;

        let mut notes = Vec::new();
        let mut skipped = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(&dir, err))?;
            let Some(id) = record_stem(&entry.path()) else {
                continue;
            };
            match self.read_note(&id) {
                Ok(note) => notes.push(note),
                Err(err) => {
                    skipped += 1;
                    warn!(
                        "event=note_list_skip module=repo status=skipped note_id={} error_kind={}",
                        id,
                        err.kind()
                    );
                }
            }
        }

        notes.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        info!(
            "event=note_list module=repo status=ok count={} skipped={}",
            notes.len(),
            skipped
        );
        Ok(notes)
    }
}

fn checked_id(store: &FileStore, id: &str) -> StoreResult<()> {
    validate_note_id(id).map_err(|err| StoreError::Invalid {
        path: store.notes_dir(),
        source: RecordValidationError::Note(err),
    })
}

/// File stem of a `*.json` record path; temp and foreign files yield `None`.
fn record_stem(path: &Path) -> Option<String> {
    if path.extension()? != RECORD_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}
