//! Built-in layout engine.

use std::f32::consts::TAU;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use super::{LayoutEngine, LayoutError, LayoutRequest};
use crate::event::VarId;
use crate::graph::Position;

/// Deterministic ring placement with warm-start stability.
///
/// Known variables keep their previous positions untouched; variables seen
/// for the first time are placed on a circle whose circumference grows with
/// the node count. Not a force model — it exists so the pipeline runs and
/// tests deterministically without an external oracle, and as the reference
/// for the warm-start contract real engines must honor.
#[derive(Clone, Copy, Debug)]
pub struct RingLayout {
    /// Target spacing between adjacent new nodes on the ring.
    pub spacing: f32,
}

impl Default for RingLayout {
    fn default() -> Self {
        Self { spacing: 30.0 }
    }
}

#[async_trait]
impl LayoutEngine for RingLayout {
    async fn compute(
        &self,
        request: LayoutRequest<'_>,
    ) -> Result<FxHashMap<VarId, Position>, LayoutError> {
        let mut ids: Vec<VarId> = request.nodes.keys().copied().collect();
        ids.sort_unstable();
        let n = ids.len().max(1) as f32;
        let radius = (n * self.spacing) / TAU;

        let mut positions = FxHashMap::default();
        for (index, var) in ids.into_iter().enumerate() {
            let position = match request.previous.get(&var) {
                Some(previous) => *previous,
                None => {
                    let angle = index as f32 / n * TAU;
                    Position::new(radius * angle.cos(), radius * angle.sin())
                }
            };
            positions.insert(var, position);
        }
        Ok(positions)
    }
}
