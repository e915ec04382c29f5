//! Bounded linear snapshot stack for the graph editor.

use crate::model::graph::GraphData;
use std::collections::VecDeque;

/// Maximum number of snapshots retained.
pub const HISTORY_CAPACITY: usize = 50;

/// Snapshot history with a cursor pointing at the current state.
///
/// `cursor` is `None` only while the history is empty.
#[derive(Debug, Clone)]
pub struct GraphHistory {
    snapshots: VecDeque<GraphData>,
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for GraphHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates a history holding at most `capacity` snapshots (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Discards everything and starts over from `snapshot`.
    pub fn reset(&mut self, snapshot: GraphData) {
        self.snapshots.clear();
        self.snapshots.push_back(snapshot);
        self.cursor = Some(0);
    }

    /// Records a new current state.
    ///
    /// Drops snapshots after the cursor, appends, then evicts the oldest
    /// entries beyond capacity.
    pub fn push(&mut self, snapshot: GraphData) {
        if let Some(cursor) = self.cursor {
            self.snapshots.truncate(cursor + 1);
        }
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = Some(self.snapshots.len() - 1);
    }

    /// Steps back one snapshot. No-op at the oldest snapshot.
    pub fn undo(&mut self) -> Option<&GraphData> {
        let cursor = self.cursor.filter(|cursor| *cursor > 0)? - 1;
        self.cursor = Some(cursor);
        self.snapshots.get(cursor)
    }

    /// Steps forward one snapshot. No-op at the newest snapshot.
    pub fn redo(&mut self) -> Option<&GraphData> {
        let cursor = self.cursor? + 1;
        if cursor >= self.snapshots.len() {
            return None;
        }
        self.cursor = Some(cursor);
        self.snapshots.get(cursor)
    }

    pub fn current(&self) -> Option<&GraphData> {
        self.snapshots.get(self.cursor?)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.snapshots.len())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
