//! Vertex degree classification.
//!
//! Splits the graph's vertices into endpoints (degree 1), pseudo-nodes (degree 2,
//! eligible for chain contraction) and junctions (degree 3 or more), and groups
//! edges that share the same unordered endpoint pair.

use crate::graph::{EdgeId, PlanarGraph, VertexKey};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Degree-1 vertices, in input order.
    pub endpoints: Vec<VertexKey>,
    /// Degree-2 vertices mapped to the two edges through them. Vertices whose
    /// degree comes from a self-loop are never listed here.
    pub pseudo_nodes: AHashMap<VertexKey, (EdgeId, EdgeId)>,
    /// Degree >= 3 vertices, in input order.
    pub junctions: Vec<VertexKey>,
    /// Edges sharing an unordered endpoint pair, groups of two or more, each group
    /// sorted by id and groups ordered by endpoint pair.
    pub parallel_groups: Vec<Vec<EdgeId>>,
    endpoint_set: AHashSet<VertexKey>,
}

impl Classification {
    pub fn is_endpoint(&self, v: &VertexKey) -> bool {
        self.endpoint_set.contains(v)
    }

    pub fn is_pseudo_node(&self, v: &VertexKey) -> bool {
        self.pseudo_nodes.contains_key(v)
    }

    /// The edge continuing a chain through pseudo-node `v` after arriving on `via`.
    pub fn continuation(&self, v: &VertexKey, via: EdgeId) -> Option<EdgeId> {
        let &(a, b) = self.pseudo_nodes.get(v)?;
        if a == via {
            Some(b)
        } else if b == via {
            Some(a)
        } else {
            None
        }
    }
}

pub fn classify(graph: &PlanarGraph) -> Classification {
    let adjacency = graph.adjacency();
    let mut out = Classification::default();

    for v in adjacency.vertices() {
        let incident = adjacency.incident(v);
        match incident.len() {
            1 => {
                out.endpoints.push(*v);
                out.endpoint_set.insert(*v);
            }
            2 => {
                // a self-loop alone also gives degree 2, but it is not a pass-through
                let (a, b) = (incident[0], incident[1]);
                if a != b {
                    out.pseudo_nodes.insert(*v, (a, b));
                }
            }
            0 => {}
            _ => out.junctions.push(*v),
        }
    }

    let mut groups: BTreeMap<(VertexKey, VertexKey), Vec<EdgeId>> = BTreeMap::new();
    for edge in graph.edges() {
        groups.entry(edge.endpoint_pair()).or_default().push(edge.id);
    }
    out.parallel_groups = groups
        .into_values()
        .filter(|ids| ids.len() >= 2)
        .map(|mut ids| {
            ids.sort_unstable();
            ids
        })
        .collect();

    out
}
