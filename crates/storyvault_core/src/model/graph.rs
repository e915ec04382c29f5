//! Worldbuilding graph model.
//!
//! # Responsibility
//! - Define nodes (entities) and edges (relationships) stored in
//!   `graph/nodes.json`.
//! - Validate identity rules before the graph is trusted or written.
//!
//! # Invariants
//! - Node ids are unique and non-empty; so are edge ids.
//! - Edge endpoints are non-empty strings.
//! - Edges pointing at missing nodes are tolerated; they are reported by
//!   `dangling_edges` but never rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fallback label for nodes without one.
pub const UNTITLED_LABEL: &str = "Untitled";

/// Closed set of entity kinds offered by the canvas context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Character,
    Location,
    Event,
    PlotPoint,
    Theme,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Character,
        NodeKind::Location,
        NodeKind::Event,
        NodeKind::PlotPoint,
        NodeKind::Theme,
    ];

    /// Wire name, as stored in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Event => "event",
            Self::PlotPoint => "plot_point",
            Self::Theme => "theme",
        }
    }

    /// Human label used for freshly created nodes (`New plot point`).
    pub fn display_name(self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }
}

/// 2-D canvas coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One worldbuilding entity on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Missing in files written before positions were tracked.
    #[serde(default)]
    pub position: Position,
    /// Free-form attributes edited in the node sidebar.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: Option<NodeKind>, position: Position) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind,
            position,
            data: Map::new(),
        }
    }

    /// Label shown on the canvas: `label`, then `data.label`, then a fallback.
    pub fn display_label(&self) -> String {
        self.label
            .as_deref()
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.data
                    .get("label")
                    .and_then(Value::as_str)
                    .filter(|value| !value.is_empty())
            })
            .unwrap_or(UNTITLED_LABEL)
            .to_string()
    }

    /// Copies the display label into both `label` and `data.label`.
    pub fn normalize_label(&mut self) {
        let label = self.display_label();
        self.data
            .insert("label".to_string(), Value::String(label.clone()));
        self.label = Some(label);
    }
}

/// Directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            kind: None,
            animated: None,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Whole canvas state; the unit of persistence and of undo snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Validation error for graph identity rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphValidationError {
    EmptyNodeId { index: usize },
    DuplicateNodeId(String),
    EmptyEdgeId { index: usize },
    DuplicateEdgeId(String),
    EmptyEdgeEndpoint(String),
    /// NaN or infinite coordinates; JSON cannot represent them.
    NonFinitePosition(String),
}

impl Display for GraphValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNodeId { index } => write!(f, "node #{index} has an empty id"),
            Self::DuplicateNodeId(id) => write!(f, "duplicate node id `{id}`"),
            Self::EmptyEdgeId { index } => write!(f, "edge #{index} has an empty id"),
            Self::DuplicateEdgeId(id) => write!(f, "duplicate edge id `{id}`"),
            Self::EmptyEdgeEndpoint(id) => write!(f, "edge `{id}` has an empty endpoint"),
            Self::NonFinitePosition(id) => write!(f, "node `{id}` has a non-finite position"),
        }
    }
}

impl Error for GraphValidationError {}

impl GraphData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn validate(&self) -> Result<(), GraphValidationError> {
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(GraphValidationError::EmptyNodeId { index });
            }
            if !node_ids.insert(node.id.as_str()) {
                return Err(GraphValidationError::DuplicateNodeId(node.id.clone()));
            }
            if !node.position.is_finite() {
                return Err(GraphValidationError::NonFinitePosition(node.id.clone()));
            }
        }

        let mut edge_ids = HashSet::with_capacity(self.edges.len());
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.id.is_empty() {
                return Err(GraphValidationError::EmptyEdgeId { index });
            }
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(GraphValidationError::DuplicateEdgeId(edge.id.clone()));
            }
            if edge.source.is_empty() || edge.target.is_empty() {
                return Err(GraphValidationError::EmptyEdgeEndpoint(edge.id.clone()));
            }
        }

        Ok(())
    }

    /// Edges whose source or target node is missing.
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        let node_ids: HashSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|edge| {
                !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str())
            })
            .collect()
    }
}
