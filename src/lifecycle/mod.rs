//! Lifecycle notifications for external observers.
//!
//! The pipeline reports connection state changes, protocol/transport
//! failures, layout trouble, and the terminal "solution found" signal
//! through a small hub: producers emit [`LifecycleEvent`]s into a channel,
//! a background listener broadcasts them to pluggable [`LifecycleSink`]s
//! (status UI, logs, test capture). Nothing in here is load-bearing for
//! ingestion — a slow or missing observer never blocks the pipeline.

mod hub;
mod sink;

pub use hub::{LifecycleEmitter, LifecycleHub};
pub use sink::{ChannelSink, LifecycleSink, MemorySink, TracingSink};

use serde::{Deserialize, Serialize};

/// Failure classes surfaced to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed frame; the connection is treated as unreliable and closed.
    Protocol,
    /// Socket-level failure; triggers reconnection with backoff.
    Transport,
    /// Layout oracle failed or timed out; previous snapshot stays in force.
    LayoutOracle,
}

/// A notification about the pipeline's externally visible state.
///
/// All variants are informational. Failures never terminate the pipeline;
/// only an explicit stop request does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// A producer connection was established.
    Connected {
        connection_id: String,
        addr: String,
        attempt: u32,
    },
    /// The active connection went away. `graceful` is true when the stream
    /// ended with an end-of-stream frame rather than a transport failure.
    Disconnected {
        connection_id: String,
        graceful: bool,
        reason: Option<String>,
    },
    /// A recoverable failure somewhere in the pipeline.
    Error { kind: ErrorKind, detail: String },
    /// The solver reported a solution; the graph carries a terminal flag
    /// from here on.
    Terminal,
    /// Structural ingestion stalled on a full queue beyond the configured
    /// threshold.
    ThroughputWarning { stalled_ms: u64 },
}

impl LifecycleEvent {
    /// Short label for logging and routing.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Connected { .. } => "connected",
            LifecycleEvent::Disconnected { .. } => "disconnected",
            LifecycleEvent::Error { .. } => "error",
            LifecycleEvent::Terminal => "terminal",
            LifecycleEvent::ThroughputWarning { .. } => "throughput_warning",
        }
    }

    /// Structured JSON form with a normalized schema, for sinks that feed
    /// dashboards or logs.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind(),
            "event": self,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_form_carries_kind_and_payload() {
        let event = LifecycleEvent::Error {
            kind: ErrorKind::Transport,
            detail: "connection refused".into(),
        };
        let json = event.to_json_value();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["event"]["Error"]["detail"], "connection refused");
    }
}
