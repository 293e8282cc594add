//! Periodic snapshot production.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{LayoutEngine, LayoutRequest};
use crate::graph::{GraphSnapshot, GraphView, InteractionGraph, NodeView, Position, SnapshotPublisher};
use crate::lifecycle::{ErrorKind, LifecycleEmitter, LifecycleEvent};

/// Periodically turns the mutable graph into immutable, laid-out
/// snapshots.
///
/// Each tick: skip if the graph generation matches the last published
/// snapshot; otherwise read-copy the graph, hand the oracle the previous
/// positions as a warm start, and publish the result. Oracle failures and
/// timeouts leave the previous snapshot in force (stale-but-valid) and are
/// retried on the next tick.
pub struct LayoutScheduler {
    graph: Arc<RwLock<InteractionGraph>>,
    engine: Arc<dyn LayoutEngine>,
    publisher: SnapshotPublisher,
    interval: Duration,
    timeout: Duration,
    lifecycle: LifecycleEmitter,
    shutdown: watch::Receiver<bool>,
}

impl LayoutScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Arc<RwLock<InteractionGraph>>,
        engine: Arc<dyn LayoutEngine>,
        publisher: SnapshotPublisher,
        interval: Duration,
        timeout: Duration,
        lifecycle: LifecycleEmitter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            graph,
            engine,
            publisher,
            interval,
            timeout,
            lifecycle,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => self.pass().await,
            }
        }
    }

    /// One scheduling pass. Public for deterministic driving in tests.
    pub async fn pass(&mut self) {
        let previous = self.publisher.latest();
        let view = {
            let graph = self.graph.read();
            if graph.generation() == previous.generation {
                return;
            }
            graph.view()
        };
        let warm_start = previous.positions();
        let request = LayoutRequest {
            nodes: &view.nodes,
            edges: &view.edges,
            previous: &warm_start,
        };

        match tokio::time::timeout(self.timeout, self.engine.compute(request)).await {
            Ok(Ok(positions)) => {
                let generation = view.generation;
                if self.publisher.publish(assemble(view, positions)) {
                    tracing::trace!(generation, "snapshot published");
                }
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "layout oracle failed; serving stale snapshot");
                self.lifecycle.emit(LifecycleEvent::Error {
                    kind: ErrorKind::LayoutOracle,
                    detail: err.to_string(),
                });
            }
            Err(_) => {
                tracing::debug!(timeout = ?self.timeout, "layout oracle timed out; serving stale snapshot");
                self.lifecycle.emit(LifecycleEvent::Error {
                    kind: ErrorKind::LayoutOracle,
                    detail: format!("timed out after {:?}", self.timeout),
                });
            }
        }
    }
}

fn assemble(view: GraphView, positions: FxHashMap<u64, Position>) -> GraphSnapshot {
    let nodes = view
        .nodes
        .into_iter()
        .map(|(var, heat)| {
            let position = positions.get(&var).copied().unwrap_or_default();
            (var, NodeView { heat, position })
        })
        .collect();
    GraphSnapshot {
        generation: view.generation,
        terminal: view.terminal,
        nodes,
        edges: view.edges,
        computed_at: Utc::now(),
    }
}
