//! Immutable, versioned renderings of the interaction graph.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::event::VarId;

/// 2D position of a laid-out node. Owned exclusively by the layout
/// scheduler; the mutable graph never stores positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A node as a renderer sees it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub heat: f32,
    pub position: Position,
}

/// An edge as a renderer sees it. `a < b` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    pub a: VarId,
    pub b: VarId,
    pub weight: f32,
}

/// Immutable snapshot of the graph at one generation: positions, heat, and
/// edges. Published atomically; any number of readers may hold references.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Generation of the graph this snapshot was computed from.
    pub generation: u64,
    /// Whether the solver has reported a solution.
    pub terminal: bool,
    pub nodes: FxHashMap<VarId, NodeView>,
    pub edges: Vec<EdgeView>,
    pub computed_at: DateTime<Utc>,
}

impl GraphSnapshot {
    /// The snapshot published before any layout has run.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            terminal: false,
            nodes: FxHashMap::default(),
            edges: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    pub fn position_of(&self, var: VarId) -> Option<Position> {
        self.nodes.get(&var).map(|n| n.position)
    }

    /// Positions keyed by variable, used as the warm start for the next
    /// layout pass.
    pub fn positions(&self) -> FxHashMap<VarId, Position> {
        self.nodes
            .iter()
            .map(|(var, node)| (*var, node.position))
            .collect()
    }
}

/// Receiving side of snapshot publication. `borrow()` always yields the
/// latest fully published snapshot, never a partial one.
pub type SnapshotReceiver = watch::Receiver<Arc<GraphSnapshot>>;

/// Write side of snapshot publication, held by the layout scheduler.
///
/// Publication order is generation-monotonic: an attempt to publish a
/// snapshot older than the current one is refused.
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<GraphSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new() -> (Self, SnapshotReceiver) {
        let (tx, rx) = watch::channel(Arc::new(GraphSnapshot::empty()));
        (Self { tx }, rx)
    }

    /// Atomically replace the current snapshot. Returns false (and leaves
    /// the current snapshot in place) if `snapshot` is older than what is
    /// already published.
    pub fn publish(&self, snapshot: GraphSnapshot) -> bool {
        let current = self.tx.borrow().generation;
        if snapshot.generation < current {
            tracing::warn!(
                current,
                offered = snapshot.generation,
                "refusing to publish stale snapshot"
            );
            return false;
        }
        self.tx.send_replace(Arc::new(snapshot));
        true
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<GraphSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_at(generation: u64) -> GraphSnapshot {
        GraphSnapshot {
            generation,
            ..GraphSnapshot::empty()
        }
    }

    #[test]
    fn publication_is_generation_monotonic() {
        let (publisher, rx) = SnapshotPublisher::new();
        assert!(publisher.publish(snapshot_at(5)));
        assert!(!publisher.publish(snapshot_at(3)));
        assert_eq!(rx.borrow().generation, 5);
        assert!(publisher.publish(snapshot_at(5)));
        assert!(publisher.publish(snapshot_at(9)));
        assert_eq!(rx.borrow().generation, 9);
    }

    #[test]
    fn readers_keep_superseded_snapshots_alive() {
        let (publisher, rx) = SnapshotPublisher::new();
        publisher.publish(snapshot_at(1));
        let held = rx.borrow().clone();
        publisher.publish(snapshot_at(2));
        assert_eq!(held.generation, 1);
        assert_eq!(publisher.latest().generation, 2);
    }
}
