//! Note domain model.
//!
//! # Responsibility
//! - Define the on-disk note record (`notes/<id>.json`).
//! - Own id, tag and timestamp rules checked at every store boundary.
//! - Derive plain-text previews for note listings.
//!
//! # Invariants
//! - `id` is a safe file stem; it doubles as the filename key.
//! - `updated_at` is never earlier than `created_at`.
//! - Tags are compared case-insensitively after trimming.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Maximum id length; keeps filenames well under common path limits.
pub const NOTE_ID_MAX_CHARS: usize = 128;
/// Preview length used by note listings.
pub const PREVIEW_MAX_CHARS: usize = 100;

static NOTE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("valid note id regex"));
static MARKUP_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid markup tag regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#\d+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// A user-authored rich-text document.
///
/// Serialized with camelCase keys to stay readable by the desktop UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Rich text markup produced by the editor. Opaque to the store.
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validation error for note invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyId,
    InvalidId(String),
    IdTooLong(usize),
    UpdatedBeforeCreated,
    /// Stored `id` disagrees with the file it was read from.
    IdMismatch { expected: String, found: String },
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "note id must not be empty"),
            Self::InvalidId(value) => write!(
                f,
                "note id `{value}` must use [A-Za-z0-9._-] and not start with `.`"
            ),
            Self::IdTooLong(len) => write!(
                f,
                "note id is {len} chars; maximum is {NOTE_ID_MAX_CHARS}"
            ),
            Self::UpdatedBeforeCreated => write!(f, "updatedAt must be >= createdAt"),
            Self::IdMismatch { expected, found } => {
                write!(f, "note file `{expected}` holds id `{found}`")
            }
        }
    }
}

impl Error for NoteValidationError {}

impl Note {
    /// Creates an empty note with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title)
    }

    /// Creates an empty note with a caller-provided id.
    ///
    /// Used by import paths and tests. Does not validate `id`.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at` to now.
    ///
    /// Never moves the timestamp backwards past `created_at`, even under
    /// clock skew.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now < self.created_at {
            self.created_at
        } else {
            now
        };
    }

    /// Validates the record before persistence or after a read.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_note_id(&self.id)?;
        if self.updated_at < self.created_at {
            return Err(NoteValidationError::UpdatedBeforeCreated);
        }
        Ok(())
    }

    /// Plain-text preview of the rich text body.
    pub fn preview(&self) -> Option<String> {
        derive_preview(&self.content)
    }
}

/// Checks that `id` is usable as the `notes/<id>.json` file stem.
pub fn validate_note_id(id: &str) -> Result<(), NoteValidationError> {
    if id.is_empty() {
        return Err(NoteValidationError::EmptyId);
    }
    let len = id.chars().count();
    if len > NOTE_ID_MAX_CHARS {
        return Err(NoteValidationError::IdTooLong(len));
    }
    if !NOTE_ID_RE.is_match(id) {
        return Err(NoteValidationError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Normalizes one tag value: trimmed, lowercase, blank rejected.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, sorted by name.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

/// Derives a plain-text preview from rich text markup.
///
/// Rules:
/// - markup tags are replaced by spaces;
/// - the five XML entities and `&nbsp;` are decoded, others dropped;
/// - whitespace is collapsed and the first 100 chars retained.
pub fn derive_preview(content: &str) -> Option<String> {
    let without_tags = MARKUP_TAG_RE.replace_all(content, " ");
    let decoded = ENTITY_RE.replace_all(&without_tags, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" | "#39" => "'",
            _ => " ",
        }
        .to_string()
    });
    let normalized = WHITESPACE_RE.replace_all(&decoded, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}
