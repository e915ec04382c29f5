//! Write-to-temp-then-rename record writer.
//!
//! # Invariants
//! - The temp file is a sibling of the target (`<name>.tmp`), so the final
//!   rename never crosses a filesystem boundary.
//! - On any failure the temp file is removed and the target is untouched.

use super::{StoreError, StoreResult};
use log::{debug, warn};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to a target file name while it is being written.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Returns the sibling temp path used while writing `target`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_else(|| OsString::from("record"));
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

/// Serializes `value` as pretty JSON and atomically replaces `target`.
///
/// Readers observe either the previous content or the full new content.
///
/// # Errors
/// - `StoreError::Serialize` when `value` cannot be encoded; nothing is
///   written in that case.
/// - `StoreError::Io` when the temp write, flush, or rename fails.
pub fn write_json_atomic<T: Serialize + ?Sized>(target: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
    }

    let tmp_path = temp_path_for(target);
    match write_then_rename(&tmp_path, target, &bytes) {
        Ok(()) => {
            debug!(
                "event=atomic_write module=store status=ok path={} bytes={}",
                target.display(),
                bytes.len()
            );
            Ok(())
        }
        Err(err) => {
            discard_temp(&tmp_path);
            warn!(
                "event=atomic_write module=store status=error path={} error_kind={}",
                target.display(),
                err.kind()
            );
            Err(err)
        }
    }
}

fn write_then_rename(tmp_path: &Path, target: &Path, bytes: &[u8]) -> StoreResult<()> {
    {
        let file = File::create(tmp_path).map_err(|err| StoreError::io(tmp_path, err))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes)
            .map_err(|err| StoreError::io(tmp_path, err))?;
        writer
            .write_all(b"\n")
            .map_err(|err| StoreError::io(tmp_path, err))?;
        writer.flush().map_err(|err| StoreError::io(tmp_path, err))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|err| StoreError::io(tmp_path, err))?;
    }

    std::fs::rename(tmp_path, target).map_err(|err| StoreError::io(target, err))
}

fn discard_temp(tmp_path: &Path) {
    if tmp_path.exists() {
        if let Err(err) = std::fs::remove_file(tmp_path) {
            warn!(
                "event=temp_cleanup module=store status=error path={} error={}",
                tmp_path.display(),
                err
            );
        }
    }
}
