//! # Satscope: Live SAT Solver Trace Visualization Pipeline
//!
//! Satscope consumes the execution trace a SAT solver streams over a socket
//! and maintains a continuously updated, laid-out graph of variable
//! interactions for a renderer. It is the part of a trace visualizer with
//! real concurrency, ordering, and backpressure concerns — everything
//! between the wire and the draw call.
//!
//! ## Architecture
//!
//! ```text
//! producer socket → ConnectionManager → FrameDecoder → TraceEvent
//!        → bounded queue → EventProcessor → InteractionGraph
//!        → LayoutScheduler (+ LayoutEngine oracle) → GraphSnapshot → renderer
//! ```
//!
//! - The **interaction graph** has exactly one writer. Everyone else reads
//!   consistent copies or immutable published snapshots.
//! - **Structural fidelity is never compromised by load**: clause and
//!   conflict events back-pressure the socket rather than drop, while heat
//!   touches and heartbeats degrade gracefully.
//! - **Layout failures are never fatal**: the previous snapshot stays in
//!   force until the oracle recovers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use satscope::config::PipelineConfig;
//! use satscope::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() {
//!     satscope::telemetry::init();
//!
//!     let handle = Pipeline::new(PipelineConfig::from_env()).start();
//!
//!     // A renderer polls or subscribes for snapshots.
//!     let mut snapshots = handle.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow().clone();
//!         draw(&snapshot);
//!         if snapshot.terminal {
//!             break;
//!         }
//!     }
//!
//!     handle.shutdown().await;
//! }
//! # fn draw(_snapshot: &satscope::graph::GraphSnapshot) {}
//! ```
//!
//! ## Module Guide
//!
//! - [`event`] - The trace event vocabulary
//! - [`wire`] - Frame codec: encoding and the resumable decoder
//! - [`connection`] - Socket lifecycle, reconnection, frame dispatch
//! - [`ingest`] - Bounded queue, backpressure policy, the event processor
//! - [`graph`] - The interaction graph and immutable snapshots
//! - [`layout`] - Layout oracle seam and the snapshot scheduler
//! - [`lifecycle`] - Observer notifications (status, errors, terminal)
//! - [`pipeline`] - Assembly, task spawning, and shutdown
//! - [`config`] - Tunables with environment resolution
//! - [`telemetry`] - Tracing subscriber setup

pub mod config;
pub mod connection;
pub mod event;
pub mod graph;
pub mod ingest;
pub mod layout;
pub mod lifecycle;
pub mod pipeline;
pub mod telemetry;
pub mod wire;
