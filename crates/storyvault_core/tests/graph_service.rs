use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Instant;
use storyvault_core::{
    ChangeKind, FileStore, GraphData, GraphNode, GraphRepository, GraphService,
    GraphServiceError, NodeKind, Position, StoreChange, StoreEntity, SAVE_DEBOUNCE,
};
use tempfile::TempDir;

fn setup() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    (dir, store)
}

fn graph_change(store: &FileStore, kind: ChangeKind) -> StoreChange {
    StoreChange {
        kind,
        path: store.graph_path(),
        entity: StoreEntity::Graph,
    }
}

/// Replaces the graph file with a non-empty directory so renames onto it fail.
fn block_graph_file(store: &FileStore) {
    let path = store.graph_path();
    if path.exists() {
        std::fs::remove_file(&path).unwrap();
    }
    std::fs::create_dir_all(path.join("occupied")).unwrap();
}

fn unblock_graph_file(store: &FileStore) {
    std::fs::remove_dir_all(store.graph_path()).unwrap();
}

#[test]
fn add_node_gets_default_label_and_records_history() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();

    let id = service
        .add_node(NodeKind::Character, Position::new(100.0, 50.0), now)
        .unwrap();

    let node = service.snapshot().node(&id).unwrap();
    assert_eq!(node.label.as_deref(), Some("New character"));
    assert_eq!(node.kind, Some(NodeKind::Character));
    assert!(service.history().can_undo());
    assert!(service.has_pending_save());
}

#[test]
fn deleting_a_node_removes_incident_edges() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let hero = service
        .add_node(NodeKind::Character, Position::default(), now)
        .unwrap();
    let town = service
        .add_node(NodeKind::Location, Position::default(), now)
        .unwrap();
    let war = service
        .add_node(NodeKind::Event, Position::default(), now)
        .unwrap();
    service.connect(&hero, &town, now).unwrap();
    service.connect(&town, &war, now).unwrap();

    service.delete_node(&town, now).unwrap();

    assert_eq!(service.nodes().len(), 2);
    assert!(service.edges().is_empty());
    assert!(matches!(
        service.delete_node(&town, now),
        Err(GraphServiceError::NodeNotFound(_))
    ));
}

#[test]
fn connect_rejects_unknown_nodes_and_deduplicates() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let a = service
        .add_node(NodeKind::Theme, Position::default(), now)
        .unwrap();
    let b = service
        .add_node(NodeKind::PlotPoint, Position::default(), now)
        .unwrap();

    let first = service.connect(&a, &b, now).unwrap();
    assert_eq!(first, Some(format!("e-{a}-{b}")));
    assert_eq!(service.connect(&a, &b, now).unwrap(), None);
    assert!(matches!(
        service.connect(&a, "ghost", now),
        Err(GraphServiceError::NodeNotFound(id)) if id == "ghost"
    ));
    assert_eq!(service.edges().len(), 1);
}

#[test]
fn undo_restores_previous_snapshot_and_redo_reapplies() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let id = service
        .add_node(NodeKind::Character, Position::default(), now)
        .unwrap();

    assert!(service.undo(now));
    assert!(service.nodes().is_empty());
    assert!(!service.undo(now));

    assert!(service.redo(now));
    assert!(service.snapshot().node(&id).is_some());
    assert!(!service.redo(now));
}

#[test]
fn dragging_records_history_only_on_drag_stop() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let id = service
        .add_node(NodeKind::Location, Position::default(), now)
        .unwrap();
    let len_before = service.history().len();

    service.move_node(&id, Position::new(5.0, 5.0), now).unwrap();
    service.move_node(&id, Position::new(40.0, 12.0), now).unwrap();
    assert_eq!(service.history().len(), len_before);

    service.drag_stop(now);
    assert_eq!(service.history().len(), len_before + 1);

    assert!(service.undo(now));
    assert_eq!(
        service.snapshot().node(&id).unwrap().position,
        Position::default()
    );
}

#[test]
fn non_finite_positions_are_rejected() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let id = service
        .add_node(NodeKind::Event, Position::new(3.0, 4.0), now)
        .unwrap();

    assert!(matches!(
        service.move_node(&id, Position::new(f64::NAN, 1.0), now),
        Err(GraphServiceError::InvalidPosition { node_id }) if node_id == id
    ));
    assert_eq!(
        service.snapshot().node(&id).unwrap().position,
        Position::new(3.0, 4.0)
    );

    let infinite = GraphNode::new("far", None, Position::new(0.0, f64::INFINITY));
    assert!(matches!(
        service.insert_node(infinite, now),
        Err(GraphServiceError::InvalidPosition { .. })
    ));
    assert!(service.snapshot().node("far").is_none());

    service.flush().unwrap();
    assert_eq!(&store.read_graph().unwrap(), service.snapshot());
}

#[test]
fn update_node_data_merges_and_syncs_label() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let id = service
        .add_node(NodeKind::Character, Position::default(), now)
        .unwrap();
    let len_before = service.history().len();

    let mut patch = Map::new();
    patch.insert("label".to_string(), json!("Ada"));
    patch.insert("age".to_string(), json!(34));
    service.update_node_data(&id, patch, now).unwrap();

    let node = service.snapshot().node(&id).unwrap();
    assert_eq!(node.label.as_deref(), Some("Ada"));
    assert_eq!(node.data.get("age"), Some(&Value::from(34)));
    assert_eq!(service.history().len(), len_before);
}

#[test]
fn debounced_save_writes_the_graph() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    service
        .add_node(NodeKind::Event, Position::default(), now)
        .unwrap();

    assert!(!service.flush_if_due(now).unwrap());
    assert!(store.read_graph().unwrap().is_empty());

    assert!(service.flush_if_due(now + SAVE_DEBOUNCE).unwrap());
    assert_eq!(&store.read_graph().unwrap(), service.snapshot());
    assert!(!service.has_pending_save());
}

#[test]
fn failed_save_stays_pending_and_blocks_external_reload() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();
    let id = service
        .add_node(NodeKind::Character, Position::default(), now)
        .unwrap();
    block_graph_file(&store);

    assert!(matches!(
        service.flush_if_due(now + SAVE_DEBOUNCE),
        Err(GraphServiceError::Store(_))
    ));
    assert!(service.has_pending_save());
    assert!(service.flush().is_err());
    assert!(service.has_pending_save());

    unblock_graph_file(&store);
    store.write_graph(&GraphData::empty()).unwrap();
    assert!(!service
        .apply_external_change(&graph_change(&store, ChangeKind::Modified))
        .unwrap());
    assert!(service.snapshot().node(&id).is_some());
    assert!(service.history().can_undo());

    assert!(service.flush_if_due(now + SAVE_DEBOUNCE).unwrap());
    assert!(!service.has_pending_save());
    assert!(store.read_graph().unwrap().node(&id).is_some());
}

#[test]
fn nothing_is_written_before_load() {
    let (_dir, store) = setup();
    let existing = GraphData {
        nodes: vec![GraphNode::new("keep", None, Position::default())],
        edges: Vec::new(),
    };
    store.write_graph(&existing).unwrap();

    let mut service = GraphService::new(&store);
    assert!(!service.flush_if_due(Instant::now() + SAVE_DEBOUNCE).unwrap());
    assert!(matches!(service.flush(), Err(GraphServiceError::NotLoaded)));
    assert_eq!(store.read_graph().unwrap().nodes.len(), 1);
}

#[test]
fn load_gives_unlabelled_nodes_a_display_label() {
    let (_dir, store) = setup();
    std::fs::write(
        store.graph_path(),
        serde_json::to_vec(&json!({
            "nodes": [{ "id": "n1", "type": "location", "position": { "x": 1, "y": 2 } }],
            "edges": []
        }))
        .unwrap(),
    )
    .unwrap();

    let mut service = GraphService::new(&store);
    service.load().unwrap();

    assert!(service.nodes()[0].label.is_some());
    assert_eq!(service.history().len(), 1);
}

#[test]
fn external_change_reloads_unless_local_save_pending() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let now = Instant::now();

    let mut external = GraphData::empty();
    external.nodes.push(GraphNode::new(
        "from-disk",
        Some(NodeKind::Theme),
        Position::default(),
    ));
    external.nodes[0].label = Some("Loss".to_string());
    store.write_graph(&external).unwrap();

    assert!(service
        .apply_external_change(&graph_change(&store, ChangeKind::Modified))
        .unwrap());
    assert!(service.snapshot().node("from-disk").is_some());
    assert!(!service.history().can_undo());

    service
        .add_node(NodeKind::Event, Position::default(), now)
        .unwrap();
    let before = service.snapshot().clone();
    external.nodes.clear();
    store.write_graph(&external).unwrap();
    assert!(!service
        .apply_external_change(&graph_change(&store, ChangeKind::Modified))
        .unwrap());
    assert_eq!(service.snapshot(), &before);
}

#[test]
fn changes_to_other_records_are_ignored() {
    let (_dir, store) = setup();
    let mut service = GraphService::new(&store);
    service.load().unwrap();
    let change = StoreChange {
        kind: ChangeKind::Modified,
        path: PathBuf::from("notes/a.json"),
        entity: StoreEntity::Note("a".to_string()),
    };
    assert!(!service.apply_external_change(&change).unwrap());
}
