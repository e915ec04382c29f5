//! Installation-wide settings (`settings.json`).
//!
//! # Invariants
//! - One settings record per installation.
//! - `auto_save_interval_ms` stays within the range the settings slider
//!   offers (1s..=10s).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const AUTO_SAVE_MIN_MS: u64 = 1_000;
pub const AUTO_SAVE_MAX_MS: u64 = 10_000;
pub const AUTO_SAVE_DEFAULT_MS: u64 = 2_000;
pub const FONT_SIZE_MIN: u16 = 8;
pub const FONT_SIZE_MAX: u16 = 72;
pub const FONT_SIZE_DEFAULT: u16 = 14;
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    /// Milliseconds between autosaves.
    #[serde(rename = "autoSaveInterval")]
    pub auto_save_interval_ms: u64,
    pub data_path: String,
    pub language: String,
    pub editor_font_size: u16,
    pub show_line_numbers: bool,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    #[serde(rename = "autoSaveInterval")]
    pub auto_save_interval_ms: Option<u64>,
    pub data_path: Option<String>,
    pub language: Option<String>,
    pub editor_font_size: Option<u16>,
    pub show_line_numbers: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsValidationError {
    AutoSaveOutOfRange(u64),
    FontSizeOutOfRange(u16),
    EmptyLanguage,
    EmptyDataPath,
}

impl Display for SettingsValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoSaveOutOfRange(value) => write!(
                f,
                "autoSaveInterval {value}ms outside {AUTO_SAVE_MIN_MS}..={AUTO_SAVE_MAX_MS}"
            ),
            Self::FontSizeOutOfRange(value) => write!(
                f,
                "editorFontSize {value} outside {FONT_SIZE_MIN}..={FONT_SIZE_MAX}"
            ),
            Self::EmptyLanguage => write!(f, "language must not be empty"),
            Self::EmptyDataPath => write!(f, "dataPath must not be empty"),
        }
    }
}

impl Error for SettingsValidationError {}

impl Settings {
    /// Defaults for a fresh installation rooted at `base_dir`.
    pub fn defaults_for(base_dir: &Path) -> Self {
        Self {
            theme: Theme::default(),
            auto_save_interval_ms: AUTO_SAVE_DEFAULT_MS,
            data_path: base_dir.display().to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            editor_font_size: FONT_SIZE_DEFAULT,
            show_line_numbers: false,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsValidationError> {
        if !(AUTO_SAVE_MIN_MS..=AUTO_SAVE_MAX_MS).contains(&self.auto_save_interval_ms) {
            return Err(SettingsValidationError::AutoSaveOutOfRange(
                self.auto_save_interval_ms,
            ));
        }
        if !(FONT_SIZE_MIN..=FONT_SIZE_MAX).contains(&self.editor_font_size) {
            return Err(SettingsValidationError::FontSizeOutOfRange(
                self.editor_font_size,
            ));
        }
        if self.language.trim().is_empty() {
            return Err(SettingsValidationError::EmptyLanguage);
        }
        if self.data_path.trim().is_empty() {
            return Err(SettingsValidationError::EmptyDataPath);
        }
        Ok(())
    }

    /// Returns a copy with every field present in `patch` replaced.
    pub fn apply(&self, patch: &SettingsPatch) -> Self {
        Self {
            theme: patch.theme.unwrap_or(self.theme),
            auto_save_interval_ms: patch
                .auto_save_interval_ms
                .unwrap_or(self.auto_save_interval_ms),
            data_path: patch
                .data_path
                .clone()
                .unwrap_or_else(|| self.data_path.clone()),
            language: patch
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
            editor_font_size: patch.editor_font_size.unwrap_or(self.editor_font_size),
            show_line_numbers: patch.show_line_numbers.unwrap_or(self.show_line_numbers),
        }
    }
}
