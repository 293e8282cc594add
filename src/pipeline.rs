//! Pipeline assembly: wiring, task spawning, and clean shutdown.

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::connection::ConnectionManager;
use crate::graph::{GraphParams, GraphSnapshot, InteractionGraph, SnapshotPublisher, SnapshotReceiver};
use crate::ingest::{EventProcessor, ingest_channel};
use crate::layout::{LayoutEngine, LayoutScheduler, RingLayout};
use crate::lifecycle::LifecycleHub;

/// Builder for the full ingestion/layout pipeline.
///
/// ```no_run
/// use satscope::config::PipelineConfig;
/// use satscope::pipeline::Pipeline;
///
/// # async fn example() {
/// let handle = Pipeline::new(PipelineConfig::new("127.0.0.1:9900")).start();
/// let mut snapshots = handle.subscribe();
/// while snapshots.changed().await.is_ok() {
///     let snapshot = snapshots.borrow().clone();
///     println!("generation {} with {} nodes", snapshot.generation, snapshot.nodes.len());
/// }
/// handle.shutdown().await;
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    engine: Arc<dyn LayoutEngine>,
    hub: LifecycleHub,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            engine: Arc::new(RingLayout::default()),
            hub: LifecycleHub::default(),
        }
    }

    /// Swap in a real layout oracle.
    #[must_use]
    pub fn with_engine(mut self, engine: Arc<dyn LayoutEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use a custom lifecycle hub (extra sinks, test capture).
    #[must_use]
    pub fn with_lifecycle_hub(mut self, hub: LifecycleHub) -> Self {
        self.hub = hub;
        self
    }

    /// Spawn the connection, processing, and layout tasks. Must be called
    /// from within a tokio runtime.
    pub fn start(self) -> PipelineHandle {
        self.hub.listen();
        let emitter = self.hub.emitter();

        let graph = Arc::new(RwLock::new(InteractionGraph::new(GraphParams::from(
            &self.config,
        ))));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue, queue_rx) = ingest_channel(
            self.config.queue_capacity,
            self.config.structural_stall_warning,
            emitter.clone(),
        );
        let (publisher, snapshots) = SnapshotPublisher::new();

        let manager = ConnectionManager::new(
            &self.config,
            queue,
            emitter.clone(),
            shutdown_rx.clone(),
        );
        let processor = EventProcessor::new(
            graph.clone(),
            queue_rx,
            self.config.decay_interval,
            emitter.clone(),
            shutdown_rx.clone(),
        );
        let scheduler = LayoutScheduler::new(
            graph.clone(),
            self.engine,
            publisher,
            self.config.layout_interval,
            self.config.layout_timeout,
            emitter,
            shutdown_rx,
        );

        let tasks = vec![
            tokio::spawn(manager.run()),
            tokio::spawn(processor.run()),
            tokio::spawn(scheduler.run()),
        ];

        PipelineHandle {
            graph,
            snapshots,
            shutdown: shutdown_tx,
            tasks,
            hub: self.hub,
        }
    }
}

/// Running pipeline: snapshot access for renderers plus the stop switch.
pub struct PipelineHandle {
    graph: Arc<RwLock<InteractionGraph>>,
    snapshots: SnapshotReceiver,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    hub: LifecycleHub,
}

impl PipelineHandle {
    /// The latest fully published snapshot. Never partial; may be stale
    /// while the layout oracle is struggling.
    pub fn latest(&self) -> Arc<GraphSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// A change-notified snapshot receiver for polling or subscribing
    /// renderers.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.clone()
    }

    /// Current generation of the underlying graph (may be ahead of the
    /// published snapshot by up to one layout tick).
    pub fn graph_generation(&self) -> u64 {
        self.graph.read().generation()
    }

    /// Whether the solver has reported a solution.
    pub fn is_terminal(&self) -> bool {
        self.graph.read().is_terminal()
    }

    /// The lifecycle hub, e.g. to attach additional sinks at runtime.
    pub fn lifecycle(&self) -> &LifecycleHub {
        &self.hub
    }

    /// Stop every task and wait for them to settle. Connection reads
    /// unblock, timers cancel, and queued lifecycle events are flushed.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        join_all(self.tasks).await;
        self.hub.stop().await;
    }
}
