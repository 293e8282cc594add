//! Trace event model.
//!
//! A producer-side solver emits a stream of [`TraceEvent`]s describing its
//! execution: clauses it learned or visited, variables it touched, conflicts
//! it ran into, and eventually a solution or the end of the stream. Events
//! are ephemeral — each one is consumed exactly once by the event processor.
//!
//! Events come in two classes with different delivery guarantees (see
//! [`crate::ingest`]):
//!
//! - **Structural** events change the interaction graph's topology or edge
//!   weights and are never dropped.
//! - **Cosmetic** events only affect transient heat or liveness and may be
//!   coalesced or dropped under load.

use serde::{Deserialize, Serialize};

/// Identifier of a solver variable. Positive, unbounded in principle —
/// encoded as a varint on the wire.
pub type VarId = u64;

/// Sign a variable was touched with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
}

/// A variable together with its assigned truth value, as reported in a
/// solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub var: VarId,
    pub value: bool,
}

impl Literal {
    pub fn new(var: VarId, value: bool) -> Self {
        Self { var, value }
    }
}

/// One event in a solver trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// The solver observed a clause over these variables. Every unordered
    /// pair of them co-occurred once.
    ClauseObserved { vars: Vec<VarId> },
    /// The solver touched (assigned/propagated) a variable at `step`.
    VariableTouched {
        var: VarId,
        polarity: Polarity,
        step: u64,
    },
    /// The solver hit a conflict involving these variables. Same pair rule
    /// as [`TraceEvent::ClauseObserved`], stronger interaction signal.
    ConflictObserved { vars: Vec<VarId> },
    /// The solver found a satisfying assignment.
    SolutionFound { assignment: Vec<Literal> },
    /// Producer liveness signal; carries no payload.
    Heartbeat,
    /// Graceful end of the trace. No structural events follow.
    StreamEnded,
}

impl TraceEvent {
    /// Whether this event changes graph topology or edge weights.
    ///
    /// Structural events must never be dropped by the ingestion queue;
    /// everything else degrades gracefully under load.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TraceEvent::ClauseObserved { .. }
                | TraceEvent::ConflictObserved { .. }
                | TraceEvent::SolutionFound { .. }
                | TraceEvent::StreamEnded
        )
    }

    /// Short label for logging and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TraceEvent::ClauseObserved { .. } => "clause",
            TraceEvent::VariableTouched { .. } => "touch",
            TraceEvent::ConflictObserved { .. } => "conflict",
            TraceEvent::SolutionFound { .. } => "solution",
            TraceEvent::Heartbeat => "heartbeat",
            TraceEvent::StreamEnded => "stream_end",
        }
    }

    /// The variable a cosmetic touch applies to, if any. Used by the
    /// coalescing policy: only the latest touch per variable needs to
    /// survive a congestion window.
    pub fn touched_var(&self) -> Option<VarId> {
        match self {
            TraceEvent::VariableTouched { var, .. } => Some(*var),
            _ => None,
        }
    }
}
