//! Graph repository contract and file-store implementation.
//!
//! # Invariants
//! - A missing `graph/nodes.json` reads as an empty graph.
//! - Dangling edges are logged, never rejected.

use crate::model::graph::GraphData;
use crate::store::{FileStore, StoreResult};
use log::{debug, warn};

pub trait GraphRepository {
    /// Reads the whole graph; missing file yields `GraphData::empty()`.
    fn read_graph(&self) -> StoreResult<GraphData>;
    /// Validates then atomically replaces the whole graph.
    fn write_graph(&self, graph: &GraphData) -> StoreResult<()>;
}

impl<T: GraphRepository + ?Sized> GraphRepository for &T {
    fn read_graph(&self) -> StoreResult<GraphData> {
        (**self).read_graph()
    }

    fn write_graph(&self, graph: &GraphData) -> StoreResult<()> {
        (**self).write_graph(graph)
    }
}

impl GraphRepository for FileStore {
    fn read_graph(&self) -> StoreResult<GraphData> {
        let path = self.graph_path();
        if !path.exists() {
            debug!("event=graph_read module=repo status=empty reason=missing_file");
            return Ok(GraphData::empty());
        }
        let graph: GraphData =
            self.read_record(&path, |graph: &GraphData| graph.validate().map_err(Into::into))?;
        report_dangling(&graph);
        Ok(graph)
    }

    fn write_graph(&self, graph: &GraphData) -> StoreResult<()> {
        let path = self.graph_path();
        report_dangling(graph);
        self.write_record(&path, graph, graph.validate().map_err(Into::into))
    }
}

fn report_dangling(graph: &GraphData) {
    let dangling = graph.dangling_edges().len();
    if dangling > 0 {
        warn!(
            "event=graph_dangling_edges module=repo status=tolerated count={} nodes={} edges={}",
            dangling,
            graph.nodes.len(),
            graph.edges.len()
        );
    }
}
