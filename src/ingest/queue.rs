//! The bounded event queue and its overflow policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

use crate::event::{TraceEvent, VarId};
use crate::lifecycle::{LifecycleEmitter, LifecycleEvent};

/// Counters for the degradation the overflow policy applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Touches superseded by a newer touch of the same variable while the
    /// queue was full.
    pub coalesced_touches: u64,
    /// Heartbeats dropped on overflow.
    pub dropped_heartbeats: u64,
}

#[derive(Debug, Default)]
struct StatCells {
    coalesced_touches: AtomicU64,
    dropped_heartbeats: AtomicU64,
}

/// Create the bounded ingestion channel. The receiver side goes to the
/// event processor; the [`EventQueue`] handle goes to connection I/O.
pub fn ingest_channel(
    capacity: usize,
    stall_warning: Duration,
    lifecycle: LifecycleEmitter,
) -> (EventQueue, flume::Receiver<TraceEvent>) {
    let (tx, rx) = flume::bounded(capacity);
    (
        EventQueue {
            tx,
            pending_touches: Arc::new(Mutex::new(FxHashMap::default())),
            stats: Arc::new(StatCells::default()),
            stall_warning,
            lifecycle,
        },
        rx,
    )
}

/// Producer handle enforcing the backpressure policy of the ingestion
/// queue.
///
/// Structural pushes await queue space (back-pressuring the caller);
/// cosmetic pushes never wait. Coalesced touches are parked in a
/// per-variable map and flushed opportunistically before later pushes, so
/// the most recent touch per variable survives any congestion window.
#[derive(Clone)]
pub struct EventQueue {
    tx: flume::Sender<TraceEvent>,
    pending_touches: Arc<Mutex<FxHashMap<VarId, TraceEvent>>>,
    stats: Arc<StatCells>,
    stall_warning: Duration,
    lifecycle: LifecycleEmitter,
}

impl EventQueue {
    /// Enqueue one event under the class-appropriate policy.
    ///
    /// Returns false when the processing side is gone (pipeline shutting
    /// down); the caller should stop reading.
    pub async fn push(&self, event: TraceEvent) -> bool {
        self.flush_pending();
        if event.is_structural() {
            self.push_structural(event).await
        } else {
            self.push_cosmetic(event)
        }
    }

    async fn push_structural(&self, event: TraceEvent) -> bool {
        let started = Instant::now();
        if self.tx.send_async(event).await.is_err() {
            return false;
        }
        let stalled = started.elapsed();
        if stalled >= self.stall_warning {
            self.lifecycle.emit(LifecycleEvent::ThroughputWarning {
                stalled_ms: stalled.as_millis() as u64,
            });
        }
        true
    }

    fn push_cosmetic(&self, event: TraceEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(event)) => {
                match event.touched_var() {
                    Some(var) => {
                        // Latest touch per variable wins; an older parked
                        // touch is superseded, not queued behind it.
                        let superseded = self.pending_touches.lock().insert(var, event);
                        if superseded.is_some() {
                            self.stats.coalesced_touches.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    None => {
                        self.stats.dropped_heartbeats.fetch_add(1, Ordering::Relaxed);
                    }
                }
                true
            }
            Err(flume::TrySendError::Disconnected(_)) => false,
        }
    }

    /// Opportunistically drain parked touches into free queue slots.
    fn flush_pending(&self) {
        let mut pending = self.pending_touches.lock();
        if pending.is_empty() {
            return;
        }
        pending.retain(|_, event| self.tx.try_send(event.clone()).is_err());
    }

    /// Number of touches currently parked for coalescing.
    pub fn parked_touches(&self) -> usize {
        self.pending_touches.lock().len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            coalesced_touches: self.stats.coalesced_touches.load(Ordering::Relaxed),
            dropped_heartbeats: self.stats.dropped_heartbeats.load(Ordering::Relaxed),
        }
    }
}
