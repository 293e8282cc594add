use std::io::Result as IoResult;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::LifecycleEvent;

/// Abstraction over an output target that consumes lifecycle events.
pub trait LifecycleSink: Send + Sync {
    /// Handle one event. The sink decides how to format or forward it.
    fn handle(&mut self, event: &LifecycleEvent) -> IoResult<()>;
}

/// Default sink: routes events into the `tracing` log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LifecycleSink for TracingSink {
    fn handle(&mut self, event: &LifecycleEvent) -> IoResult<()> {
        match event {
            LifecycleEvent::Error { kind, detail } => {
                tracing::warn!(kind = ?kind, detail = %detail, "pipeline error");
            }
            LifecycleEvent::ThroughputWarning { stalled_ms } => {
                tracing::warn!(stalled_ms, "structural ingestion stalled");
            }
            other => {
                tracing::info!(kind = other.kind(), "lifecycle event");
            }
        }
        Ok(())
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<LifecycleEvent> {
        self.entries.lock().unwrap().clone()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl LifecycleSink for MemorySink {
    fn handle(&mut self, event: &LifecycleEvent) -> IoResult<()> {
        self.entries.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Channel-based sink for streaming to async consumers (status bars, SSE
/// endpoints). Events are forwarded without blocking.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<LifecycleEvent>) -> Self {
        Self { tx }
    }
}

impl LifecycleSink for ChannelSink {
    fn handle(&mut self, event: &LifecycleEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "receiver dropped"))
    }
}
