// ===========================================================================
// Chain contraction
// ===========================================================================
//
// Contracts runs of edges joined only through pseudo-nodes (degree-2 vertices)
// into single edges.
//
// Seeds, in order:
// 1. Degree-1 vertices, in input order.
// 2. Junction vertices whose incident edge leads into a pseudo-node.
// 3. Edges whose both endpoints are pseudo-nodes (rings); these always end in a
//    repeated edge and are left unmerged.
//
// A walk ends at a degree-1 vertex, at a vertex with no continuation, or the
// moment it would revisit an edge.
// ===========================================================================

use crate::attributes::zip_attributes;
use crate::control::PassControl;
use crate::degree::{Classification, classify};
use crate::error::CleanError;
use crate::geometry::GeometryService;
use crate::graph::{Edge, EdgeId, PlanarGraph, VertexKey};
use ahash::AHashSet;
use geo::MultiLineString;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

/// One contracted chain: the original members in walk order and the edges that
/// replaced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedChain {
    pub members: Vec<EdgeId>,
    pub produced: Vec<EdgeId>,
}

#[derive(Debug)]
pub struct MergeOutput {
    pub graph: PlanarGraph,
    pub chains: Vec<MergedChain>,
    /// Exact duplicates found in parallel groups. Dropped as whole groups.
    pub dropped_duplicates: Vec<EdgeId>,
    pub issues: Vec<CleanError>,
    pub complete: bool,
}

enum Walk {
    Chain(Vec<EdgeId>),
    Cycle {
        members: Vec<EdgeId>,
        repeated: EdgeId,
    },
}

pub struct ChainMerger<'g, G: GeometryService> {
    geometry: &'g G,
    merge_attributes: bool,
}

impl<'g, G: GeometryService> ChainMerger<'g, G> {
    pub fn new(geometry: &'g G) -> Self {
        Self {
            geometry,
            merge_attributes: true,
        }
    }

    /// When true, merged edges carry a list of member values per attribute key;
    /// otherwise they keep the first member's attributes.
    pub fn merge_attributes(mut self, merge: bool) -> Self {
        self.merge_attributes = merge;
        self
    }

    /// Members of parallel groups that are geometrically equal to another member.
    pub fn find_exact_duplicates(
        &self,
        graph: &PlanarGraph,
        classification: &Classification,
    ) -> Vec<EdgeId> {
        let mut duplicates: AHashSet<EdgeId> = AHashSet::new();
        for group in &classification.parallel_groups {
            for (a, b) in group.iter().tuple_combinations() {
                let (Some(ea), Some(eb)) = (graph.edge(*a), graph.edge(*b)) else {
                    continue;
                };
                if self.geometry.equal(&ea.geometry, &eb.geometry) {
                    duplicates.insert(*a);
                    duplicates.insert(*b);
                }
            }
        }
        let mut duplicates: Vec<EdgeId> = duplicates.into_iter().collect();
        duplicates.sort_unstable();
        duplicates
    }

    pub fn merge(
        &self,
        mut graph: PlanarGraph,
        control: &mut PassControl<'_>,
    ) -> Result<MergeOutput, CleanError> {
        let edges_in = graph.len();

        let dropped_duplicates = self.find_exact_duplicates(&graph, &classify(&graph));
        if !dropped_duplicates.is_empty() {
            debug!("Dropping {} exact parallel duplicates", dropped_duplicates.len());
            graph.remove_edges(&dropped_duplicates);
        }

        let classification = classify(&graph);
        let seeds = chain_seeds(&graph, &classification);

        let mut visited: AHashSet<EdgeId> = AHashSet::new();
        let mut walks: Vec<Vec<EdgeId>> = Vec::new();
        let mut issues: Vec<CleanError> = Vec::new();
        let mut complete = true;

        for (i, (start, first)) in seeds.iter().enumerate() {
            if control.is_cancelled() {
                warn!("Chain merge cancelled after {} of {} seeds", i, seeds.len());
                issues.push(CleanError::CancellationRequested { pass: "merge" });
                complete = false;
                break;
            }
            control.progress(i, seeds.len());

            if visited.contains(first) {
                continue;
            }

            match walk(&graph, &classification, &visited, *start, *first) {
                Walk::Chain(members) => {
                    visited.extend(members.iter().copied());
                    if members.len() >= 2 {
                        walks.push(members);
                    }
                }
                Walk::Cycle { members, repeated } => {
                    warn!(
                        "Chain starting at edge {} loops back onto edge {}, left unmerged",
                        members[0], repeated
                    );
                    issues.push(CleanError::UnboundedChain {
                        start: members[0],
                        repeated,
                    });
                    visited.extend(members);
                }
            }
        }

        let mut chains: Vec<MergedChain> = Vec::with_capacity(walks.len());
        let mut new_edges: Vec<Edge> = Vec::new();
        for members in walks {
            let produced = self.contract(&mut graph, &members);
            debug!(
                "Merged chain {:?} into {:?}",
                members,
                produced.iter().map(|e| e.id).collect::<Vec<_>>()
            );
            chains.push(MergedChain {
                members,
                produced: produced.iter().map(|e| e.id).collect(),
            });
            new_edges.extend(produced);
        }

        let consumed: Vec<EdgeId> = chains
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect();
        graph.remove_edges(&consumed);
        graph.add_edges(new_edges)?;
        if complete {
            control.report(1.0);
        }

        info!(
            "Chain merge: {} edges -> {} edges ({} chains merged, {} duplicates dropped)",
            edges_in,
            graph.len(),
            chains.len(),
            dropped_duplicates.len()
        );

        Ok(MergeOutput {
            graph,
            chains,
            dropped_duplicates,
            issues,
            complete,
        })
    }

    /// Unions the members in walk order. One output edge per part of the union.
    fn contract(&self, graph: &mut PlanarGraph, members: &[EdgeId]) -> Vec<Edge> {
        let edges: Vec<&Edge> = members.iter().filter_map(|id| graph.edge(*id)).collect();
        let Some(first) = edges.first() else {
            return Vec::new();
        };

        let mut merged = MultiLineString::new(vec![first.geometry.clone()]);
        for edge in &edges[1..] {
            merged = self
                .geometry
                .combine(&merged, &MultiLineString::new(vec![edge.geometry.clone()]));
        }

        let attributes = if self.merge_attributes {
            zip_attributes(edges.iter().map(|e| &e.attributes))
        } else {
            first.attributes.clone()
        };

        merged
            .0
            .into_iter()
            .map(|part| Edge::new(graph.next_id(), attributes.clone(), part))
            .collect()
    }
}

fn chain_seeds(graph: &PlanarGraph, c: &Classification) -> Vec<(VertexKey, EdgeId)> {
    let adjacency = graph.adjacency();
    let mut seeds: Vec<(VertexKey, EdgeId)> = Vec::new();

    for v in &c.endpoints {
        if let Some(&id) = adjacency.incident(v).first() {
            seeds.push((*v, id));
        }
    }

    for j in &c.junctions {
        for &id in adjacency.incident(j).iter().unique() {
            let Some(edge) = graph.edge(id) else { continue };
            if !edge.is_self_loop() && c.is_pseudo_node(&edge.opposite(*j)) {
                seeds.push((*j, id));
            }
        }
    }

    for edge in graph.edges() {
        if c.is_pseudo_node(&edge.start()) && c.is_pseudo_node(&edge.end()) {
            seeds.push((edge.start(), edge.id));
        }
    }

    seeds
}

fn walk(
    graph: &PlanarGraph,
    c: &Classification,
    visited: &AHashSet<EdgeId>,
    start: VertexKey,
    first: EdgeId,
) -> Walk {
    let mut members = vec![first];
    let mut in_chain: AHashSet<EdgeId> = AHashSet::new();
    in_chain.insert(first);

    let mut current = first;
    let mut terminal = match graph.edge(first) {
        Some(e) => e.opposite(start),
        None => return Walk::Chain(members),
    };

    loop {
        if c.is_endpoint(&terminal) {
            break;
        }
        let Some(next) = c.continuation(&terminal, current) else {
            break;
        };
        if in_chain.contains(&next) || visited.contains(&next) {
            return Walk::Cycle {
                members,
                repeated: next,
            };
        }
        let Some(next_edge) = graph.edge(next) else {
            break;
        };
        in_chain.insert(next);
        members.push(next);
        terminal = next_edge.opposite(terminal);
        current = next;
    }

    Walk::Chain(members)
}
