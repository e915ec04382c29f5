//! Graph editor state store.
//!
//! # Responsibility
//! - Hold the canvas nodes/edges the UI renders.
//! - Record undo snapshots for discrete edits (add, delete, connect,
//!   drag-stop) and restore them on undo/redo.
//! - Persist the graph through a debounced save.
//!
//! # Invariants
//! - Deleting a node also deletes every edge touching it.
//! - Continuous edits (dragging, typing into node fields) do not record
//!   history; `drag_stop` records the final position.
//! - Nothing is written before the graph has been loaded, so an empty
//!   in-memory graph never clobbers the file on disk.
//! - A failed save stays pending until a write succeeds.
//! - Node positions are always finite.

use crate::history::graph_history::GraphHistory;
use crate::model::graph::{GraphData, GraphEdge, GraphNode, NodeKind, Position};
use crate::repo::graph_repo::GraphRepository;
use crate::service::autosave::Debouncer;
use crate::store::{ChangeKind, StoreChange, StoreEntity, StoreError};
use log::{debug, error, info};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Service error for graph editing use-cases.
#[derive(Debug)]
pub enum GraphServiceError {
    /// Operation needs a loaded graph.
    NotLoaded,
    /// Referenced node does not exist.
    NodeNotFound(String),
    /// Position has a NaN or infinite coordinate.
    InvalidPosition { node_id: String },
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for GraphServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "graph has not been loaded"),
            Self::NodeNotFound(id) => write!(f, "graph node not found: {id}"),
            Self::InvalidPosition { node_id } => {
                write!(f, "non-finite position for graph node {node_id}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for GraphServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type GraphServiceResult<T> = Result<T, GraphServiceError>;

/// Graph editor facade over a graph repository.
pub struct GraphService<R: GraphRepository> {
    repo: R,
    graph: GraphData,
    history: GraphHistory,
    save: Debouncer,
    loaded: bool,
}

impl<R: GraphRepository> GraphService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_debouncer(repo, Debouncer::default())
    }

    pub fn with_debouncer(repo: R, save: Debouncer) -> Self {
        Self {
            repo,
            graph: GraphData::empty(),
            history: GraphHistory::new(),
            save,
            loaded: false,
        }
    }

    /// Loads the graph from storage and starts a fresh history.
    ///
    /// Node labels are normalized so every node has a display label.
    pub fn load(&mut self) -> GraphServiceResult<&GraphData> {
        let mut graph = self.repo.read_graph()?;
        for node in &mut graph.nodes {
            node.normalize_label();
        }
        self.history.reset(graph.clone());
        self.graph = graph;
        self.loaded = true;
        self.save.cancel();
        info!(
            "event=graph_load module=service status=ok nodes={} edges={}",
            self.graph.nodes.len(),
            self.graph.edges.len()
        );
        Ok(&self.graph)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn snapshot(&self) -> &GraphData {
        &self.graph
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.graph.edges
    }

    pub fn history(&self) -> &GraphHistory {
        &self.history
    }

    /// Adds a new entity of `kind` at `position`; returns its id.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        position: Position,
        now: Instant,
    ) -> GraphServiceResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut node = GraphNode::new(id.clone(), Some(kind), position);
        node.label = Some(format!("New {}", kind.display_name()));
        node.normalize_label();
        self.insert_node(node, now)?;
        Ok(id)
    }

    /// Appends a prepared node and records history.
    pub fn insert_node(&mut self, node: GraphNode, now: Instant) -> GraphServiceResult<()> {
        ensure_finite(&node.id, node.position)?;
        debug!("event=graph_add_node module=service node_id={}", node.id);
        self.graph.nodes.push(node);
        self.commit(now);
        Ok(())
    }

    /// Deletes one node and its incident edges.
    pub fn delete_node(&mut self, id: &str, now: Instant) -> GraphServiceResult<()> {
        if self.graph.node(id).is_none() {
            return Err(GraphServiceError::NodeNotFound(id.to_string()));
        }
        self.remove_nodes(&[id.to_string()], now);
        Ok(())
    }

    /// Deletes every node in `ids` plus incident edges; returns how many
    /// nodes were removed. Records history only when something changed.
    pub fn remove_nodes(&mut self, ids: &[String], now: Instant) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.graph.nodes.len();
        self.graph
            .nodes
            .retain(|node| !doomed.contains(node.id.as_str()));
        let removed = before - self.graph.nodes.len();
        if removed == 0 {
            return 0;
        }
        self.graph.edges.retain(|edge| {
            !doomed.contains(edge.source.as_str()) && !doomed.contains(edge.target.as_str())
        });
        self.commit(now);
        removed
    }

    /// Connects `source` to `target`.
    ///
    /// Returns the new edge id, or `None` when the same connection already
    /// exists.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        now: Instant,
    ) -> GraphServiceResult<Option<String>> {
        for endpoint in [source, target] {
            if self.graph.node(endpoint).is_none() {
                return Err(GraphServiceError::NodeNotFound(endpoint.to_string()));
            }
        }
        let exists = self
            .graph
            .edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target);
        if exists {
            return Ok(None);
        }
        let id = format!("e-{source}-{target}");
        let id = if self.graph.edges.iter().any(|edge| edge.id == id) {
            Uuid::new_v4().to_string()
        } else {
            id
        };
        self.graph
            .edges
            .push(GraphEdge::new(id.clone(), source, target));
        self.commit(now);
        Ok(Some(id))
    }

    /// Deletes the given edges; returns how many were removed.
    pub fn remove_edges(&mut self, ids: &[String], now: Instant) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|edge| !doomed.contains(edge.id.as_str()));
        let removed = before - self.graph.edges.len();
        if removed > 0 {
            self.commit(now);
        }
        removed
    }

    /// Moves a node while it is being dragged. Does not record history.
    pub fn move_node(
        &mut self,
        id: &str,
        position: Position,
        now: Instant,
    ) -> GraphServiceResult<()> {
        ensure_finite(id, position)?;
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| GraphServiceError::NodeNotFound(id.to_string()))?;
        node.position = position;
        self.save.schedule(now);
        Ok(())
    }

    /// Records the end of a drag gesture.
    pub fn drag_stop(&mut self, now: Instant) {
        self.commit(now);
    }

    /// Shallow-merges `patch` into the node's `data`. Does not record history.
    ///
    /// A string `label` in the patch also becomes the node label.
    pub fn update_node_data(
        &mut self,
        id: &str,
        patch: Map<String, Value>,
        now: Instant,
    ) -> GraphServiceResult<()> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| GraphServiceError::NodeNotFound(id.to_string()))?;
        if let Some(label) = patch.get("label").and_then(Value::as_str) {
            node.label = Some(label.to_string());
        }
        node.data.extend(patch);
        self.save.schedule(now);
        Ok(())
    }

    /// Restores the previous snapshot; returns whether anything changed.
    pub fn undo(&mut self, now: Instant) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.graph = snapshot.clone();
                self.save.schedule(now);
                true
            }
            None => false,
        }
    }

    /// Re-applies the next snapshot; returns whether anything changed.
    pub fn redo(&mut self, now: Instant) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.graph = snapshot.clone();
                self.save.schedule(now);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_save(&self) -> bool {
        self.save.is_pending()
    }

    /// Writes the graph if the debounced save is due at `now`.
    ///
    /// Returns whether a write happened. Skips silently before `load`.
    pub fn flush_if_due(&mut self, now: Instant) -> GraphServiceResult<bool> {
        if !self.loaded || !self.save.due(now) {
            return Ok(false);
        }
        self.write().map(|()| true)
    }

    /// Writes the graph immediately.
    pub fn flush(&mut self) -> GraphServiceResult<()> {
        if !self.loaded {
            return Err(GraphServiceError::NotLoaded);
        }
        self.write()
    }

    /// Reloads after an external change to the graph file.
    ///
    /// Ignored while a local save is pending (local edits win), when the
    /// change concerns another record, or when disk already matches memory.
    /// Returns whether the in-memory graph was replaced.
    pub fn apply_external_change(&mut self, change: &StoreChange) -> GraphServiceResult<bool> {
        if change.entity != StoreEntity::Graph || !self.loaded || self.save.is_pending() {
            return Ok(false);
        }
        if change.kind == ChangeKind::Removed {
            return Ok(false);
        }
        let mut disk = self.repo.read_graph()?;
        for node in &mut disk.nodes {
            node.normalize_label();
        }
        if disk == self.graph {
            return Ok(false);
        }
        self.history.reset(disk.clone());
        self.graph = disk;
        info!("event=graph_reload module=service status=ok reason=external_change");
        Ok(true)
    }

    fn commit(&mut self, now: Instant) {
        self.history.push(self.graph.clone());
        self.save.schedule(now);
    }

    fn write(&mut self) -> GraphServiceResult<()> {
        match self.repo.write_graph(&self.graph) {
            Ok(()) => {
                self.save.cancel();
                Ok(())
            }
            Err(err) => {
                self.save.retry();
                error!(
                    "event=graph_save module=service status=error error_kind={}",
                    err.kind()
                );
                Err(err.into())
            }
        }
    }
}

fn ensure_finite(node_id: &str, position: Position) -> GraphServiceResult<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(GraphServiceError::InvalidPosition {
            node_id: node_id.to_string(),
        })
    }
}
