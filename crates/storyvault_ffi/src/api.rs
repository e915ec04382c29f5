//! FFI use-case API for the UI host.
//!
//! # Responsibility
//! - Expose store operations to Dart via FRB with JSON payloads.
//! - Own the single active store and buffer its change events until the
//!   host polls them.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Record payloads use the same camelCase JSON as the files on disk.
//! - Every store-backed call fails with a message when no store is open.

use log::{info, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use storyvault_core::{
    core_version as core_version_inner, default_data_dir as default_data_dir_inner,
    init_logging as init_logging_inner, ping as ping_inner, prepare_data_dir, FileStore,
    GraphData, GraphRepository, Note, NoteRepository, ProjectRepository, Settings,
    SettingsRepository, StoreChange,
};

/// Oldest events are dropped once this many are waiting.
const EVENT_QUEUE_MAX: usize = 1024;
const WATCH_POLL_DEFAULT: u32 = 64;

static ACTIVE_STORE: Mutex<Option<FileStore>> = Mutex::new(None);
static PENDING_EVENTS: Mutex<VecDeque<StoreChange>> = Mutex::new(VecDeque::new());

/// Generic response envelope for store-backed calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// JSON payload, when the operation produces one.
    pub payload: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl BridgeResponse {
    fn success(message: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            ok: true,
            payload,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            message: message.into(),
        }
    }

    fn from_result(op: &str, result: Result<(String, Option<String>), String>) -> Self {
        match result {
            Ok((message, payload)) => Self::success(message, payload),
            Err(err) => {
                warn!("event=bridge_call module=ffi status=error op={op}");
                Self::failure(format!("{op} failed: {err}"))
            }
        }
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Default data directory (`STORYVAULT_DATA_DIR` or `~/.storyvault`).
#[flutter_rust_bridge::frb(sync)]
pub fn default_data_dir() -> String {
    default_data_dir_inner().display().to_string()
}

/// Opens (creating when needed) the store at `base_dir`.
///
/// Replaces the active store; its watcher and queued events are dropped.
/// Payload is the opened directory path.
#[flutter_rust_bridge::frb(sync)]
pub fn open_store(base_dir: String) -> BridgeResponse {
    let result = prepare_data_dir(&base_dir).and_then(|path| {
        let store = FileStore::open(&path).map_err(|err| err.to_string())?;
        let mut active = lock(&ACTIVE_STORE);
        if let Some(mut previous) = active.replace(store) {
            previous.close();
        }
        lock(&PENDING_EVENTS).clear();
        info!("event=store_activate module=ffi status=ok");
        Ok(("Store opened.".to_string(), Some(path.display().to_string())))
    });
    BridgeResponse::from_result("open_store", result)
}

/// Loads settings, seeding defaults on first run. Payload: settings JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_load() -> BridgeResponse {
    let result = with_store(|store| store.read_settings().map_err(|err| err.to_string()))
        .and_then(|settings| to_json(&settings))
        .map(|json| ("Settings loaded.".to_string(), Some(json)));
    BridgeResponse::from_result("settings_load", result)
}

/// Validates and replaces settings from a full settings JSON document.
#[flutter_rust_bridge::frb(sync)]
pub fn settings_save(settings_json: String) -> BridgeResponse {
    let result = from_json::<Settings>(&settings_json).and_then(|settings| {
        with_store(|store| store.write_settings(&settings).map_err(|err| err.to_string()))?;
        Ok(("Settings saved.".to_string(), None))
    });
    BridgeResponse::from_result("settings_save", result)
}

/// Loads project metadata. Payload is absent when no project file exists.
#[flutter_rust_bridge::frb(sync)]
pub fn project_load() -> BridgeResponse {
    let result = with_store(|store| store.read_project().map_err(|err| err.to_string())).and_then(
        |project| match project {
            Some(project) => Ok(("Project loaded.".to_string(), Some(to_json(&project)?))),
            None => Ok(("No project metadata.".to_string(), None)),
        },
    );
    BridgeResponse::from_result("project_load", result)
}

/// Reads one note. Payload: note JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn note_read(id: String) -> BridgeResponse {
    let result = with_store(|store| store.read_note(id.trim()).map_err(|err| err.to_string()))
        .and_then(|note| to_json(&note))
        .map(|json| ("Note loaded.".to_string(), Some(json)));
    BridgeResponse::from_result("note_read", result)
}

/// Validates and writes one note JSON document (last write wins).
#[flutter_rust_bridge::frb(sync)]
pub fn note_save(note_json: String) -> BridgeResponse {
    let result = from_json::<Note>(&note_json).and_then(|note| {
        with_store(|store| store.write_note(&note).map_err(|err| err.to_string()))?;
        Ok(("Note saved.".to_string(), Some(note.id)))
    });
    BridgeResponse::from_result("note_save", result)
}

/// Deletes one note. Deleting a missing note succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(id: String) -> BridgeResponse {
    let result = with_store(|store| store.delete_note(id.trim()).map_err(|err| err.to_string()))
        .map(|()| ("Note deleted.".to_string(), None));
    BridgeResponse::from_result("note_delete", result)
}

/// Lists every readable note, newest first. Payload: JSON array of notes.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list() -> BridgeResponse {
    let result = with_store(|store| store.list_notes().map_err(|err| err.to_string()))
        .and_then(|notes| {
            let message = format!("Found {} note(s).", notes.len());
            Ok((message, Some(to_json(&notes)?)))
        });
    BridgeResponse::from_result("notes_list", result)
}

/// Loads the graph; a missing graph file yields an empty graph.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_load() -> BridgeResponse {
    let result = with_store(|store| store.read_graph().map_err(|err| err.to_string()))
        .and_then(|graph| to_json(&graph))
        .map(|json| ("Graph loaded.".to_string(), Some(json)));
    BridgeResponse::from_result("graph_load", result)
}

/// Validates and replaces the graph from a `{ nodes, edges }` document.
#[flutter_rust_bridge::frb(sync)]
pub fn graph_save(graph_json: String) -> BridgeResponse {
    let result = from_json::<GraphData>(&graph_json).and_then(|graph| {
        with_store(|store| store.write_graph(&graph).map_err(|err| err.to_string()))?;
        Ok(("Graph saved.".to_string(), None))
    });
    BridgeResponse::from_result("graph_save", result)
}

/// Starts watching the active store directory.
///
/// Events are queued until `watch_poll` drains them.
#[flutter_rust_bridge::frb(sync)]
pub fn watch_start() -> BridgeResponse {
    let result = with_store(|store| {
        store
            .watch(|change| {
                let mut queue = lock(&PENDING_EVENTS);
                if queue.len() >= EVENT_QUEUE_MAX {
                    queue.pop_front();
                }
                queue.push_back(change);
            })
            .map_err(|err| err.to_string())
    })
    .map(|()| ("Watching for changes.".to_string(), None));
    BridgeResponse::from_result("watch_start", result)
}

/// Drains up to `max` queued change events (default 64).
///
/// Payload: JSON array of `{ event, filePath, entity }`.
#[flutter_rust_bridge::frb(sync)]
pub fn watch_poll(max: Option<u32>) -> BridgeResponse {
    let limit = max.filter(|value| *value > 0).unwrap_or(WATCH_POLL_DEFAULT) as usize;
    let drained = {
        let mut queue = lock(&PENDING_EVENTS);
        let take = limit.min(queue.len());
        queue.drain(..take).collect::<Vec<_>>()
    };
    let events = drained.iter().map(change_to_json).collect::<Vec<_>>();
    let result = to_json(&events).map(|json| {
        (format!("Drained {} event(s).", events.len()), Some(json))
    });
    BridgeResponse::from_result("watch_poll", result)
}

/// Stops the watcher and clears queued events.
#[flutter_rust_bridge::frb(sync)]
pub fn watch_stop() -> BridgeResponse {
    let result = with_store(|store| {
        store.close();
        Ok(())
    })
    .map(|()| {
        lock(&PENDING_EVENTS).clear();
        ("Watcher stopped.".to_string(), None)
    });
    BridgeResponse::from_result("watch_stop", result)
}

/// Interprets the host directory dialog result.
///
/// `None` means the dialog was cancelled: success with no payload.
/// Otherwise the path must be absolute and creatable; payload is the
/// created directory in canonical form.
#[flutter_rust_bridge::frb(sync)]
pub fn select_directory(picked: Option<String>) -> BridgeResponse {
    let Some(picked) = picked else {
        return BridgeResponse::success("Selection cancelled.", None);
    };
    let result = prepare_data_dir(&picked)
        .map(|path: PathBuf| ("Directory selected.".to_string(), Some(path.display().to_string())));
    BridgeResponse::from_result("select_directory", result)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_store<T>(f: impl FnOnce(&mut FileStore) -> Result<T, String>) -> Result<T, String> {
    let mut active = lock(&ACTIVE_STORE);
    let store = active
        .as_mut()
        .ok_or_else(|| "no store is open; call open_store first".to_string())?;
    f(store)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|err| format!("failed to encode payload: {err}"))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid payload: {err}"))
}

fn change_to_json(change: &StoreChange) -> serde_json::Value {
    serde_json::json!({
        "event": change.kind.as_str(),
        "filePath": change.path.display().to_string(),
        "entity": change.entity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn open_temp_store() -> (MutexGuard<'static, ()>, tempfile::TempDir) {
        let guard = lock(&TEST_LOCK);
        let dir = tempfile::tempdir().expect("tempdir");
        let response = open_store(dir.path().display().to_string());
        assert!(response.ok, "{}", response.message);
        (guard, dir)
    }

    fn payload(response: &BridgeResponse) -> Value {
        assert!(response.ok, "{}", response.message);
        serde_json::from_str(response.payload.as_deref().expect("payload")).expect("json")
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn open_store_rejects_relative_paths() {
        let _guard = lock(&TEST_LOCK);
        let response = open_store("relative/vault".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("absolute"));
    }

    #[test]
    fn note_save_read_list_delete_flow() {
        let (_guard, _dir) = open_temp_store();
        let note = json!({
            "id": "note-1",
            "title": "Test Note",
            "content": "<p>This is a test</p>",
            "tags": ["test"],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        });

        let saved = note_save(note.to_string());
        assert!(saved.ok, "{}", saved.message);

        let read = payload(&note_read("note-1".to_string()));
        assert_eq!(read["title"], json!("Test Note"));

        let listed = payload(&notes_list());
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        assert!(note_delete("note-1".to_string()).ok);
        assert!(!note_read("note-1".to_string()).ok);
    }

    #[test]
    fn note_save_rejects_malformed_json() {
        let (_guard, _dir) = open_temp_store();
        let response = note_save(json!({ "id": "x", "title": 5 }).to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid payload"));
    }

    #[test]
    fn graph_load_defaults_to_empty_and_round_trips() {
        let (_guard, _dir) = open_temp_store();
        assert_eq!(payload(&graph_load()), json!({ "nodes": [], "edges": [] }));

        let graph = json!({
            "nodes": [{ "id": "n1", "label": "Ada", "type": "character",
                        "position": { "x": 1.5, "y": 2.0 }, "data": {} }],
            "edges": []
        });
        assert!(graph_save(graph.to_string()).ok);
        assert_eq!(payload(&graph_load())["nodes"][0]["label"], json!("Ada"));
    }

    #[test]
    fn settings_load_seeds_defaults_and_save_validates() {
        let (_guard, _dir) = open_temp_store();
        let mut settings = payload(&settings_load());
        assert_eq!(settings["theme"], json!("light"));

        settings["theme"] = json!("dark");
        assert!(settings_save(settings.to_string()).ok);
        assert_eq!(payload(&settings_load())["theme"], json!("dark"));

        settings["autoSaveInterval"] = json!(50);
        assert!(!settings_save(settings.to_string()).ok);
    }

    #[test]
    fn project_load_without_file_has_no_payload() {
        let (_guard, _dir) = open_temp_store();
        let response = project_load();
        assert!(response.ok, "{}", response.message);
        assert!(response.payload.is_none());
    }

    #[test]
    fn select_directory_handles_cancel_and_creates_choice() {
        let _guard = lock(&TEST_LOCK);
        let cancelled = select_directory(None);
        assert!(cancelled.ok);
        assert!(cancelled.payload.is_none());

        let dir = tempfile::tempdir().expect("tempdir");
        let raw = format!("{}/nested/../vault", dir.path().display());
        let chosen = select_directory(Some(raw));
        assert!(chosen.ok, "{}", chosen.message);
        let expected = dir.path().canonicalize().expect("canonical").join("vault");
        assert!(expected.is_dir());
        assert_eq!(chosen.payload, Some(expected.display().to_string()));

        assert!(!select_directory(Some("not/absolute".to_string())).ok);
    }

    #[test]
    fn watch_poll_drains_queued_changes() {
        let (_guard, _dir) = open_temp_store();
        assert!(watch_start().ok);

        let note = json!({
            "id": "watched",
            "title": "Watched",
            "content": "",
            "tags": [],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        });
        assert!(note_save(note.to_string()).ok);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let mut seen = false;
        while !seen && std::time::Instant::now() < deadline {
            let events = payload(&watch_poll(None));
            seen = events.as_array().into_iter().flatten().any(|event| {
                event["entity"] == json!({ "entity": "note", "id": "watched" })
            });
            if !seen {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
        }
        assert!(seen, "watcher never reported the saved note");

        assert!(watch_stop().ok);
    }
}
