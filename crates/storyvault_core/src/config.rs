//! Process-level configuration.
//!
//! User-facing options live in `settings.json`; this module only resolves
//! where that data directory is before any store is open.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STORYVAULT_DATA_DIR";
/// Directory name used under the user's home directory.
pub const DEFAULT_DATA_DIR_NAME: &str = ".storyvault";

/// Resolves the base data directory.
///
/// Order: `STORYVAULT_DATA_DIR` (when non-blank), then `~/.storyvault`,
/// then `.storyvault` under the system temp dir when no home is known.
pub fn default_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok().as_deref(), dirs::home_dir())
}

fn data_dir_from(env_value: Option<&str>, home: Option<PathBuf>) -> PathBuf {
    if let Some(raw) = env_value {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    home.unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_DATA_DIR_NAME)
}

/// Checks a user-chosen data directory: absolute, and creatable.
///
/// Creates the directory when missing and returns its canonical form
/// (`..` segments and symlinks resolved).
pub fn prepare_data_dir(candidate: &str) -> Result<PathBuf, String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err("data directory cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!(
            "data directory must be an absolute path, got `{trimmed}`"
        ));
    }
    if path.exists() && !path.is_dir() {
        return Err(format!("`{trimmed}` exists and is not a directory"));
    }
    std::fs::create_dir_all(path)
        .map_err(|err| format!("failed to create data directory `{trimmed}`: {err}"))?;
    path.canonicalize()
        .map_err(|err| format!("failed to resolve data directory `{trimmed}`: {err}"))
}
