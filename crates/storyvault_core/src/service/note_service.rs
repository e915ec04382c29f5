//! Note editor session.
//!
//! # Responsibility
//! - Track the note currently open in the rich text editor.
//! - Debounce content saves while the user types; save immediately on the
//!   explicit save shortcut.
//! - Produce sidebar summaries with plain-text previews.
//!
//! # Invariants
//! - Tag sets are normalized (trimmed, lowercase, deduplicated) on write.
//! - `updated_at` moves forward on every persisted edit.
//! - External changes never overwrite unsaved local edits.

use crate::model::note::{normalize_tags, Note};
use crate::repo::note_repo::NoteRepository;
use crate::service::autosave::Debouncer;
use crate::store::{ChangeKind, StoreChange, StoreEntity, StoreError};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Tag input contains a blank value.
    InvalidTag(String),
    /// An operation needs an open note.
    NoNoteSelected,
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::NoNoteSelected => write!(f, "no note is open"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Sidebar list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub preview: Option<String>,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            tags: note.tags.clone(),
            updated_at: note.updated_at,
            preview: note.preview(),
        }
    }
}

/// Note session facade over a note repository.
pub struct NoteService<R: NoteRepository> {
    repo: R,
    selected: Option<Note>,
    save: Debouncer,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_debouncer(repo, Debouncer::default())
    }

    pub fn with_debouncer(repo: R, save: Debouncer) -> Self {
        Self {
            repo,
            selected: None,
            save,
        }
    }

    /// Creates, persists and opens a new empty note.
    pub fn create_note(&mut self, title: impl Into<String>) -> NoteServiceResult<&Note> {
        let note = Note::new(title);
        self.repo.write_note(&note)?;
        info!("event=note_create module=service status=ok note_id={}", note.id);
        self.replace_selection(note)
    }

    /// Opens a stored note, saving any pending edits of the previous one.
    pub fn open_note(&mut self, id: &str) -> NoteServiceResult<&Note> {
        let note = self.repo.read_note(id)?;
        self.replace_selection(note)
    }

    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_ref()
    }

    /// Closes the open note after saving pending edits.
    pub fn close_note(&mut self) -> NoteServiceResult<()> {
        self.save_pending()?;
        self.selected = None;
        Ok(())
    }

    /// Replaces the open note's body and schedules a debounced save.
    pub fn update_content(
        &mut self,
        content: impl Into<String>,
        now: Instant,
    ) -> NoteServiceResult<()> {
        let note = self
            .selected
            .as_mut()
            .ok_or(NoteServiceError::NoNoteSelected)?;
        note.content = content.into();
        self.save.schedule(now);
        Ok(())
    }

    /// Renames the open note and persists immediately.
    pub fn rename(&mut self, title: impl Into<String>) -> NoteServiceResult<&Note> {
        let note = self
            .selected
            .as_mut()
            .ok_or(NoteServiceError::NoNoteSelected)?;
        note.title = title.into();
        self.save_now()
    }

    /// Replaces the full tag set of the open note and persists immediately.
    pub fn set_tags(&mut self, tags: Vec<String>) -> NoteServiceResult<&Note> {
        if let Some(blank) = tags.iter().find(|tag| tag.trim().is_empty()) {
            return Err(NoteServiceError::InvalidTag(blank.clone()));
        }
        let note = self
            .selected
            .as_mut()
            .ok_or(NoteServiceError::NoNoteSelected)?;
        note.tags = normalize_tags(&tags);
        self.save_now()
    }

    /// Persists the open note now (editor save shortcut).
    ///
    /// A failed write leaves the note pending, so external changes still
    /// cannot replace it and the next `flush_if_due` retries.
    pub fn save_now(&mut self) -> NoteServiceResult<&Note> {
        let note = self
            .selected
            .as_mut()
            .ok_or(NoteServiceError::NoNoteSelected)?;
        note.touch();
        match self.repo.write_note(note) {
            Ok(()) => {
                self.save.cancel();
                Ok(note)
            }
            Err(err) => {
                self.save.retry();
                error!(
                    "event=note_save module=service status=error note_id={} error_kind={}",
                    note.id,
                    err.kind()
                );
                Err(err.into())
            }
        }
    }

    /// Runs the debounced save when due; returns whether a write happened.
    pub fn flush_if_due(&mut self, now: Instant) -> NoteServiceResult<bool> {
        if self.selected.is_none() || !self.save.due(now) {
            return Ok(false);
        }
        self.save_now().map(|_| true)
    }

    pub fn has_pending_save(&self) -> bool {
        self.save.is_pending()
    }

    /// Deletes a note; clears the selection when it was open.
    pub fn delete_note(&mut self, id: &str) -> NoteServiceResult<()> {
        self.repo.delete_note(id)?;
        if self.selected.as_ref().is_some_and(|note| note.id == id) {
            self.save.cancel();
            self.selected = None;
        }
        Ok(())
    }

    /// Lists sidebar summaries in listing order.
    pub fn list_summaries(&self) -> NoteServiceResult<Vec<NoteSummary>> {
        let notes = self.repo.list_notes()?;
        Ok(notes.iter().map(NoteSummary::from).collect())
    }

    /// Lists every tag in use.
    pub fn list_tags(&self) -> NoteServiceResult<Vec<String>> {
        Ok(self.repo.list_tags()?)
    }

    /// Reacts to an external change of the open note.
    ///
    /// - modified/created: reloads from disk unless local edits are pending
    ///   (last write wins, no merge);
    /// - removed: drops the selection.
    ///
    /// Returns whether the selection changed.
    pub fn reload_if_changed(&mut self, change: &StoreChange) -> NoteServiceResult<bool> {
        let StoreEntity::Note(changed_id) = &change.entity else {
            return Ok(false);
        };
        let Some(current) = self.selected.as_ref() else {
            return Ok(false);
        };
        if &current.id != changed_id || self.save.is_pending() {
            return Ok(false);
        }

        if change.kind == ChangeKind::Removed {
            if self.repo.read_note(changed_id).is_err() {
                info!(
                    "event=note_closed module=service reason=external_delete note_id={changed_id}"
                );
                self.selected = None;
                return Ok(true);
            }
            return Ok(false);
        }

        let disk = self.repo.read_note(changed_id)?;
        if Some(&disk) == self.selected.as_ref() {
            return Ok(false);
        }
        info!("event=note_reload module=service status=ok note_id={changed_id}");
        self.selected = Some(disk);
        Ok(true)
    }

    fn replace_selection(&mut self, note: Note) -> NoteServiceResult<&Note> {
        self.save_pending()?;
        Ok(self.selected.insert(note))
    }

    fn save_pending(&mut self) -> NoteServiceResult<()> {
        if self.selected.is_some() && self.save.is_pending() {
            self.save_now()?;
        }
        Ok(())
    }
}
