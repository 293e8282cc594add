//! The authoritative variable-interaction graph and its immutable snapshots.
//!
//! [`InteractionGraph`] is the single mutable structure in the pipeline.
//! Exactly one owner (the event processor) mutates it; everyone else reads
//! consistent copies taken under a short read lock and consumes published
//! [`GraphSnapshot`]s. A generation counter, bumped exactly once per
//! mutating operation that changes anything, lets the layout scheduler
//! detect staleness without copying the graph every tick.

mod model;
#[cfg(feature = "petgraph-compat")]
mod petgraph_compat;
mod snapshot;

pub use model::{EdgeKey, EdgeState, GraphParams, GraphView, InteractionGraph, VarNode};
#[cfg(feature = "petgraph-compat")]
pub use petgraph_compat::to_petgraph;
pub use snapshot::{
    EdgeView, GraphSnapshot, NodeView, Position, SnapshotPublisher, SnapshotReceiver,
};
