use serde_json::json;
use std::time::{Duration, Instant};
use storyvault_core::{
    FileStore, GraphData, GraphEdge, GraphNode, GraphRepository, NodeKind, Note, NoteRepository,
    Position, ProjectRepository, RecordValidationError, StoreError,
};
use tempfile::TempDir;

fn setup() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    (dir, store)
}

fn note(id: &str, title: &str) -> Note {
    let mut note = Note::with_id(id, title);
    note.content = "<p>This is a test</p>".to_string();
    note.tags = vec!["test".to_string()];
    note
}

#[test]
fn write_then_read_returns_equal_note() {
    let (_dir, store) = setup();
    let original = note("note-1", "Test Note");

    store.write_note(&original).unwrap();
    let loaded = store.read_note("note-1").unwrap();

    assert_eq!(loaded, original);
}

#[test]
fn write_overwrites_previous_version() {
    let (_dir, store) = setup();
    let mut draft = note("note-1", "Draft");
    store.write_note(&draft).unwrap();

    draft.title = "Final".to_string();
    draft.touch();
    store.write_note(&draft).unwrap();

    assert_eq!(store.read_note("note-1").unwrap().title, "Final");
    assert_eq!(store.list_notes().unwrap().len(), 1);
}

#[test]
fn delete_makes_subsequent_reads_fail() {
    let (_dir, store) = setup();
    store.write_note(&note("note-2", "Delete Me")).unwrap();

    store.delete_note("note-2").unwrap();

    let err = store.read_note("note-2").unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
}

#[test]
fn deleting_missing_note_is_not_an_error() {
    let (_dir, store) = setup();
    store.delete_note("never-written").unwrap();
}

#[test]
fn list_returns_every_written_note() {
    let (_dir, store) = setup();
    store.write_note(&note("note-1", "Note 1")).unwrap();
    store.write_note(&note("note-2", "Note 2")).unwrap();

    let mut ids = store
        .list_notes()
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    ids.sort();

    assert_eq!(ids, vec!["note-1".to_string(), "note-2".to_string()]);
}

#[test]
fn list_orders_by_updated_desc_then_id() {
    let (_dir, store) = setup();
    let base = chrono::Utc::now();
    for (id, offset) in [("b-older", 1), ("a-newer", 10), ("c-tie", 10)] {
        let mut item = note(id, id);
        item.created_at = base;
        item.updated_at = base + chrono::Duration::seconds(offset);
        store.write_note(&item).unwrap();
    }

    let ids = store
        .list_notes()
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a-newer", "c-tie", "b-older"]);
}

#[test]
fn schema_invalid_file_is_skipped_by_list_and_fails_direct_read() {
    let (_dir, store) = setup();
    std::fs::write(
        store.note_path("bad"),
        serde_json::to_vec(&json!({ "id": "bad", "title": 123 })).unwrap(),
    )
    .unwrap();
    store.write_note(&note("good", "Good")).unwrap();

    let listed = store.list_notes().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "good");

    let err = store.read_note("bad").unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "unexpected error: {err}");
}

#[test]
fn note_with_mismatched_id_is_rejected() {
    let (_dir, store) = setup();
    let stray = note("other-id", "Stray");
    std::fs::write(
        store.note_path("copied"),
        serde_json::to_vec(&stray).unwrap(),
    )
    .unwrap();

    let err = store.read_note("copied").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Invalid {
            source: RecordValidationError::Note(_),
            ..
        }
    ));
    assert!(store.list_notes().unwrap().is_empty());
}

#[test]
fn list_ignores_temp_and_foreign_files() {
    let (_dir, store) = setup();
    store.write_note(&note("kept", "Kept")).unwrap();
    std::fs::write(store.notes_dir().join("kept.json.tmp"), b"{").unwrap();
    std::fs::write(store.notes_dir().join("README.md"), b"# notes").unwrap();

    let listed = store.list_notes().unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
fn write_rejects_invalid_note_without_touching_disk() {
    let (_dir, store) = setup();
    let mut bad = note("../escape", "Escape");
    let err = store.write_note(&bad).unwrap_err();
    assert!(matches!(err, StoreError::Invalid { .. }));

    bad.id = "fine".to_string();
    bad.updated_at = bad.created_at - chrono::Duration::seconds(1);
    assert!(store.write_note(&bad).is_err());
    assert!(!store.note_path("fine").exists());
}

#[test]
fn list_tags_unions_normalized_tags() {
    let (_dir, store) = setup();
    let mut first = note("n1", "One");
    first.tags = vec!["Hero".to_string(), "arc".to_string()];
    let mut second = note("n2", "Two");
    second.tags = vec!["hero".to_string(), "Villain".to_string()];
    store.write_note(&first).unwrap();
    store.write_note(&second).unwrap();

    assert_eq!(store.list_tags().unwrap(), vec!["arc", "hero", "villain"]);
}

#[test]
fn listing_a_thousand_notes_stays_fast() {
    let (_dir, store) = setup();
    for idx in 0..1000 {
        let mut item = Note::with_id(format!("perf-{idx}"), format!("Perf Note {idx}"));
        item.content = "Some content".to_string();
        store.write_note(&item).unwrap();
    }

    let start = Instant::now();
    let listed = store.list_notes().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(listed.len(), 1000);
    assert!(
        elapsed < Duration::from_secs(10),
        "listing took {elapsed:?}"
    );
}

#[test]
fn missing_graph_reads_as_empty() {
    let (_dir, store) = setup();
    assert_eq!(store.read_graph().unwrap(), GraphData::empty());
}

#[test]
fn graph_round_trips_and_tolerates_dangling_edges() {
    let (_dir, store) = setup();
    let mut hero = GraphNode::new("hero", Some(NodeKind::Character), Position::new(10.0, 20.5));
    hero.label = Some("Ada".to_string());
    hero.data.insert("motivation".to_string(), json!("revenge"));
    let graph = GraphData {
        nodes: vec![hero],
        edges: vec![GraphEdge::new("e1", "hero", "missing-node")],
    };

    store.write_graph(&graph).unwrap();
    assert_eq!(store.read_graph().unwrap(), graph);
}

#[test]
fn graph_with_duplicate_node_ids_is_rejected_on_read() {
    let (_dir, store) = setup();
    std::fs::write(
        store.graph_path(),
        serde_json::to_vec(&json!({
            "nodes": [
                { "id": "a", "position": { "x": 0, "y": 0 } },
                { "id": "a", "position": { "x": 1, "y": 1 } }
            ],
            "edges": []
        }))
        .unwrap(),
    )
    .unwrap();

    let err = store.read_graph().unwrap_err();
    assert!(matches!(
        err,
        StoreError::Invalid {
            source: RecordValidationError::Graph(_),
            ..
        }
    ));
}

#[test]
fn project_metadata_is_optional() {
    let (_dir, store) = setup();
    assert!(store.read_project().unwrap().is_none());

    std::fs::write(
        store.project_path(),
        serde_json::to_vec(&json!({
            "name": "The Long Road",
            "created": "2024-01-01T00:00:00Z",
            "lastModified": "2024-02-01T12:30:00Z"
        }))
        .unwrap(),
    )
    .unwrap();

    let project = store.read_project().unwrap().unwrap();
    assert_eq!(project.name, "The Long Road");
}
