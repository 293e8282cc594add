//! The mutable, single-writer interaction graph.

use rustc_hash::FxHashMap;

use super::snapshot::EdgeView;
use crate::config::PipelineConfig;
use crate::event::VarId;

/// Heat below this clamps to zero so a cooled graph stops generating work.
const HEAT_EPSILON: f32 = 1e-4;
/// Edge weights within this of the floor snap to it.
const WEIGHT_EPSILON: f32 = 1e-4;

/// Unordered pair of variable ids. The constructor normalizes order, so
/// `(a, b)` and `(b, a)` address the same edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    a: VarId,
    b: VarId,
}

impl EdgeKey {
    /// Build a key from two distinct variable ids in either order.
    pub fn new(x: VarId, y: VarId) -> Self {
        debug_assert_ne!(x, y, "self-edges are not representable");
        if x < y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn a(&self) -> VarId {
        self.a
    }

    pub fn b(&self) -> VarId {
        self.b
    }
}

/// Mutable per-variable state. Positions live in snapshots, not here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VarNode {
    /// Recency of solver activity, decaying toward 0, saturating at the
    /// configured maximum on touch.
    pub heat: f32,
}

/// Mutable per-edge state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeState {
    pub weight: f32,
    /// Generation at which this edge was last strengthened.
    pub last_touch: u64,
}

/// Decay and increment tunables, extracted from the pipeline config.
#[derive(Clone, Copy, Debug)]
pub struct GraphParams {
    pub heat_max: f32,
    pub heat_decay: f32,
    pub weight_decay: f32,
    pub weight_floor: f32,
    pub clause_increment: f32,
    pub conflict_increment: f32,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for GraphParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            heat_max: config.heat_max,
            heat_decay: config.heat_decay,
            weight_decay: config.weight_decay,
            weight_floor: config.weight_floor,
            clause_increment: config.clause_increment,
            conflict_increment: config.conflict_increment,
        }
    }
}

/// Consistent read copy of the graph, taken under a short read lock.
#[derive(Clone, Debug)]
pub struct GraphView {
    pub generation: u64,
    pub terminal: bool,
    /// Heat per variable.
    pub nodes: FxHashMap<VarId, f32>,
    pub edges: Vec<EdgeView>,
}

/// The authoritative weighted graph of variables and their interactions.
///
/// Exactly one owner mutates it. Nodes are created on first reference and
/// never destroyed within a session; edges are created on first
/// co-occurrence and only ever decay toward a floor, so the interaction
/// history's shape is preserved while its salience fades.
///
/// Every mutating operation that changes observable state bumps
/// `generation` by exactly 1; no-ops leave it untouched, and pure reads
/// never move it. The generation is the staleness signal the layout
/// scheduler keys on.
#[derive(Debug)]
pub struct InteractionGraph {
    params: GraphParams,
    nodes: FxHashMap<VarId, VarNode>,
    edges: FxHashMap<EdgeKey, EdgeState>,
    generation: u64,
    terminal: bool,
}

impl InteractionGraph {
    pub fn new(params: GraphParams) -> Self {
        Self {
            params,
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            generation: 0,
            terminal: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn heat_of(&self, var: VarId) -> Option<f32> {
        self.nodes.get(&var).map(|n| n.heat)
    }

    pub fn weight_of(&self, x: VarId, y: VarId) -> Option<f32> {
        self.edges.get(&EdgeKey::new(x, y)).map(|e| e.weight)
    }

    /// Apply a clause observation: every unordered pair of `vars` gains the
    /// clause increment; missing nodes are created with zero heat.
    pub fn observe_clause(&mut self, vars: &[VarId]) {
        self.bump_pairs(vars, self.params.clause_increment);
    }

    /// Same pair rule as [`Self::observe_clause`] with the stronger conflict
    /// increment.
    pub fn observe_conflict(&mut self, vars: &[VarId]) {
        self.bump_pairs(vars, self.params.conflict_increment);
    }

    fn bump_pairs(&mut self, vars: &[VarId], increment: f32) {
        if vars.is_empty() {
            return;
        }
        let next_generation = self.generation + 1;
        let floor = self.params.weight_floor;
        let mut changed = false;
        for &var in vars {
            if !self.nodes.contains_key(&var) {
                self.nodes.insert(var, VarNode::default());
                changed = true;
            }
        }
        for (i, &x) in vars.iter().enumerate() {
            for &y in &vars[i + 1..] {
                if x == y {
                    continue;
                }
                let edge = self
                    .edges
                    .entry(EdgeKey::new(x, y))
                    .or_insert_with(|| EdgeState {
                        weight: floor,
                        last_touch: next_generation,
                    });
                edge.weight += increment;
                edge.last_touch = next_generation;
                changed = true;
            }
        }
        if changed {
            self.generation = next_generation;
        }
    }

    /// Set a variable's heat to the saturation maximum, creating the node on
    /// first reference. Saturating, not additive: touching N times in
    /// succession equals touching once.
    pub fn touch(&mut self, var: VarId) {
        let node = self.nodes.entry(var).or_default();
        if (node.heat - self.params.heat_max).abs() > f32::EPSILON {
            node.heat = self.params.heat_max;
            self.generation += 1;
        }
    }

    /// One decay step: every heat is multiplied by the heat decay factor and
    /// every edge weight decays toward the floor. Never removes nodes or
    /// edges. Bumps the generation once if anything moved, so a fully
    /// cooled graph stops invalidating snapshots.
    pub fn decay_tick(&mut self) {
        let mut changed = false;
        for node in self.nodes.values_mut() {
            if node.heat > 0.0 {
                node.heat *= self.params.heat_decay;
                if node.heat < HEAT_EPSILON {
                    node.heat = 0.0;
                }
                changed = true;
            }
        }
        let floor = self.params.weight_floor;
        for edge in self.edges.values_mut() {
            if edge.weight > floor {
                edge.weight = floor + (edge.weight - floor) * self.params.weight_decay;
                if edge.weight - floor < WEIGHT_EPSILON {
                    edge.weight = floor;
                }
                changed = true;
            }
        }
        if changed {
            self.generation += 1;
        }
    }

    /// Mark the terminal "solution found" flag. Idempotent.
    pub fn mark_terminal(&mut self) {
        if !self.terminal {
            self.terminal = true;
            self.generation += 1;
        }
    }

    /// Copy the current node/edge state. Intended to run under a short read
    /// lock; cost is O(nodes + edges), no allocation proportional to
    /// history.
    pub fn view(&self) -> GraphView {
        GraphView {
            generation: self.generation,
            terminal: self.terminal,
            nodes: self.nodes.iter().map(|(v, n)| (*v, n.heat)).collect(),
            edges: self
                .edges
                .iter()
                .map(|(key, state)| EdgeView {
                    a: key.a(),
                    b: key.b(),
                    weight: state.weight,
                })
                .collect(),
        }
    }
}
