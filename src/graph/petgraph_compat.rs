//! Optional petgraph compatibility layer.
//!
//! Converts a published [`GraphSnapshot`] into petgraph's undirected graph
//! type so its algorithm library (components, centrality, DOT export) can be
//! run over the interaction structure. Only available with the
//! `petgraph-compat` feature:
//!
//! ```toml
//! [dependencies]
//! satscope = { version = "0.1", features = ["petgraph-compat"] }
//! ```

use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::FxHashMap;

use super::snapshot::GraphSnapshot;
use crate::event::VarId;

/// A petgraph-compatible view of a snapshot. Node weights are variable ids,
/// edge weights are the interaction weights.
pub type InteractionUnGraph = UnGraph<VarId, f32>;

/// Convert a snapshot into an undirected petgraph graph plus the variable →
/// index mapping for lookups.
pub fn to_petgraph(snapshot: &GraphSnapshot) -> (InteractionUnGraph, FxHashMap<VarId, NodeIndex>) {
    let mut graph = UnGraph::with_capacity(snapshot.nodes.len(), snapshot.edges.len());
    let mut index_map = FxHashMap::default();
    for &var in snapshot.nodes.keys() {
        index_map.insert(var, graph.add_node(var));
    }
    for edge in &snapshot.edges {
        if let (Some(&a), Some(&b)) = (index_map.get(&edge.a), index_map.get(&edge.b)) {
            graph.add_edge(a, b, edge.weight);
        }
    }
    (graph, index_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeView, NodeView, Position};

    #[test]
    fn conversion_preserves_topology_and_weights() {
        let mut snapshot = GraphSnapshot::empty();
        for var in [1u64, 2, 3] {
            snapshot.nodes.insert(
                var,
                NodeView {
                    heat: 0.0,
                    position: Position::default(),
                },
            );
        }
        snapshot.edges.push(EdgeView {
            a: 1,
            b: 2,
            weight: 4.0,
        });

        let (graph, index_map) = to_petgraph(&snapshot);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph
            .find_edge(index_map[&1], index_map[&2])
            .expect("edge present");
        assert_eq!(graph[edge], 4.0);
    }
}
