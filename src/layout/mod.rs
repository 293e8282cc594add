//! Layout oracle seam and the snapshot scheduler.
//!
//! The layout algorithm is a black-box dependency behind [`LayoutEngine`]:
//! a pure function from `(nodes, edges, previous positions)` to new
//! positions. Modeling it as a pure function over the previous snapshot's
//! positions (the warm start) keeps the oracle trivially testable and
//! swappable — there is no stateful layout object holding implicit history.
//!
//! [`LayoutScheduler`] invokes the oracle off the ingestion path on a fixed
//! tick, skips redundant work via the graph's generation counter, and keeps
//! serving the previous snapshot whenever the oracle fails or exceeds its
//! timeout. A layout failure is never fatal and never blocks ingestion.

mod engines;
mod scheduler;

pub use engines::RingLayout;
pub use scheduler::LayoutScheduler;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::event::VarId;
use crate::graph::{EdgeView, Position};

/// Errors a layout oracle may report. Timeouts are enforced by the
/// scheduler, not the engine.
#[derive(Debug, Error, Diagnostic)]
pub enum LayoutError {
    #[error("layout computation failed: {0}")]
    #[diagnostic(
        code(satscope::layout::failed),
        help("The previous snapshot stays in force; the scheduler retries next tick.")
    )]
    Failed(String),
}

/// Input to one layout pass.
#[derive(Debug)]
pub struct LayoutRequest<'a> {
    /// Heat per variable; the oracle may use it for emphasis but must place
    /// every listed variable.
    pub nodes: &'a FxHashMap<VarId, f32>,
    pub edges: &'a [EdgeView],
    /// Positions from the previously published snapshot, used as the warm
    /// start / stability anchor. Empty on the first pass.
    pub previous: &'a FxHashMap<VarId, Position>,
}

/// The external layout algorithm.
///
/// Implementations are expected to be incremental: given the previous
/// positions they should produce small positional deltas rather than
/// recompute from scratch, to avoid visual jitter. They may be slow for
/// large graphs, which is why the scheduler calls them under a timeout.
#[async_trait]
pub trait LayoutEngine: Send + Sync {
    async fn compute(
        &self,
        request: LayoutRequest<'_>,
    ) -> Result<FxHashMap<VarId, Position>, LayoutError>;
}
