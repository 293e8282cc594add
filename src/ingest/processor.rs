//! The single-writer pipeline stage that applies events to the graph.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::event::TraceEvent;
use crate::graph::InteractionGraph;
use crate::lifecycle::{LifecycleEmitter, LifecycleEvent};

/// Sole writer to the [`InteractionGraph`].
///
/// Consumes the bounded ingestion queue and, on a fixed interval
/// independent of queue activity, injects a synthetic decay tick. After
/// `StreamEnded` no further structural events are applied, but decay keeps
/// ticking so the display cools down gracefully instead of freezing.
///
/// Each queue event or decay tick holds the write lock for one discrete
/// mutation — O(edges touched), never a full scan besides the decay pass
/// itself.
pub struct EventProcessor {
    graph: Arc<RwLock<InteractionGraph>>,
    rx: flume::Receiver<TraceEvent>,
    decay_interval: Duration,
    lifecycle: LifecycleEmitter,
    shutdown: watch::Receiver<bool>,
    stream_ended: bool,
}

impl EventProcessor {
    pub fn new(
        graph: Arc<RwLock<InteractionGraph>>,
        rx: flume::Receiver<TraceEvent>,
        decay_interval: Duration,
        lifecycle: LifecycleEmitter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            graph,
            rx,
            decay_interval,
            lifecycle,
            shutdown,
            stream_ended: false,
        }
    }

    /// Run until the stop signal fires. The queue's sender side may come
    /// and go (reconnections); a closed queue only silences structural
    /// input, never the decay clock.
    pub async fn run(mut self) {
        let mut decay = tokio::time::interval(self.decay_interval);
        decay.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut queue_open = true;
        let rx = self.rx.clone();
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = decay.tick() => {
                    self.graph.write().decay_tick();
                }
                recv = rx.recv_async(), if queue_open => match recv {
                    Ok(event) => self.apply(event),
                    Err(_) => {
                        tracing::debug!("ingestion queue closed; decay continues");
                        queue_open = false;
                    }
                }
            }
        }
    }

    fn apply(&mut self, event: TraceEvent) {
        if self.stream_ended && !matches!(event, TraceEvent::Heartbeat) {
            tracing::debug!(kind = event.kind(), "event after stream end ignored");
            return;
        }
        match event {
            TraceEvent::ClauseObserved { vars } => {
                self.graph.write().observe_clause(&vars);
            }
            TraceEvent::ConflictObserved { vars } => {
                self.graph.write().observe_conflict(&vars);
            }
            TraceEvent::VariableTouched { var, .. } => {
                self.graph.write().touch(var);
            }
            TraceEvent::SolutionFound { assignment } => {
                tracing::info!(assigned = assignment.len(), "solution reported");
                self.graph.write().mark_terminal();
                self.lifecycle.emit(LifecycleEvent::Terminal);
            }
            TraceEvent::Heartbeat => {}
            TraceEvent::StreamEnded => {
                tracing::info!("trace stream ended; structural ingestion closed");
                self.stream_ended = true;
            }
        }
    }
}
