//! Removal of duplicate and overlapping edges.

use crate::control::PassControl;
use crate::geometry::GeometryService;
use crate::graph::{Edge, EdgeId, PlanarGraph};
use crate::report::Flagged;
use crate::spatial_index::{RTreeIndex, SpatialIndex};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Geometrically equal.
    Duplicate,
    /// Sharing a collinear stretch without being equal.
    Overlap,
}

/// The outcome of comparing two edges: how they relate and which one goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub relation: Relation,
    pub remove: EdgeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub duplicates: BTreeSet<EdgeId>,
    pub overlaps: BTreeSet<EdgeId>,
    /// Edges without any bounding-box neighbour. Reported, never removed.
    pub orphans: Vec<EdgeId>,
}

impl Findings {
    pub fn to_remove(&self) -> Vec<EdgeId> {
        self.duplicates.union(&self.overlaps).copied().collect()
    }
}

#[derive(Debug)]
pub struct DedupOutput {
    pub graph: PlanarGraph,
    pub duplicates: Vec<Flagged>,
    pub overlaps: Vec<Flagged>,
    pub orphans: Vec<Flagged>,
}

pub struct DuplicateResolver<'g, G: GeometryService> {
    geometry: &'g G,
    report_orphans: bool,
    label_field: Option<String>,
}

impl<'g, G: GeometryService> DuplicateResolver<'g, G> {
    pub fn new(geometry: &'g G) -> Self {
        Self {
            geometry,
            report_orphans: false,
            label_field: None,
        }
    }

    pub fn report_orphans(mut self, report: bool) -> Self {
        self.report_orphans = report;
        self
    }

    pub fn label_field(mut self, field: Option<String>) -> Self {
        self.label_field = field;
        self
    }

    /// Per edge (in graph order), the other edges whose bounding boxes intersect it.
    pub fn find_candidates(&self, graph: &PlanarGraph) -> Vec<(EdgeId, Vec<EdgeId>)> {
        let index = RTreeIndex::from_graph(graph);
        graph
            .edges()
            .map(|edge| {
                let mut candidates = index.query_bounding_box(edge);
                candidates.retain(|&id| id != edge.id);
                (edge.id, candidates)
            })
            .collect()
    }

    /// Compares two edges.
    ///
    /// Equal geometries are duplicates and the larger id goes. Otherwise, if the
    /// intersection has a line part, the shorter edge is an overlap and goes; on a
    /// length tie the larger id goes.
    pub fn classify(&self, a: &Edge, b: &Edge) -> Option<Verdict> {
        if self.geometry.equal(&a.geometry, &b.geometry) {
            return Some(Verdict {
                relation: Relation::Duplicate,
                remove: a.id.max(b.id),
            });
        }

        if !self.geometry.intersect(&a.geometry, &b.geometry).has_line() {
            return None;
        }

        let (len_a, len_b) = (
            self.geometry.length(&a.geometry),
            self.geometry.length(&b.geometry),
        );
        let remove = if len_b < len_a {
            b.id
        } else if len_a < len_b {
            a.id
        } else {
            a.id.max(b.id)
        };
        Some(Verdict {
            relation: Relation::Overlap,
            remove,
        })
    }

    pub fn find(&self, graph: &PlanarGraph, control: &mut PassControl<'_>) -> Findings {
        let candidates = self.find_candidates(graph);
        let total = candidates.len();
        let mut findings = Findings::default();

        for (i, (id, others)) in candidates.into_iter().enumerate() {
            control.progress(i, total);

            if others.is_empty() {
                if self.report_orphans {
                    findings.orphans.push(id);
                }
                continue;
            }

            let Some(edge) = graph.edge(id) else { continue };
            for other_id in others {
                // every pair shows up from both sides; look at it once
                if other_id < id {
                    continue;
                }
                let Some(other) = graph.edge(other_id) else {
                    continue;
                };
                if let Some(verdict) = self.classify(edge, other) {
                    debug!(
                        "Edges {} and {}: {:?}, removing {}",
                        id, other_id, verdict.relation, verdict.remove
                    );
                    match verdict.relation {
                        Relation::Duplicate => findings.duplicates.insert(verdict.remove),
                        Relation::Overlap => findings.overlaps.insert(verdict.remove),
                    };
                }
            }
        }

        // an edge that is a duplicate is reported as such only
        let duplicates = findings.duplicates.clone();
        findings.overlaps.retain(|id| !duplicates.contains(id));
        control.report(1.0);
        findings
    }

    /// Deletes the flagged edges and builds the three report lists.
    pub fn remove(&self, mut graph: PlanarGraph, findings: &Findings) -> DedupOutput {
        let label = self.label_field.as_deref();
        let flag = |graph: &PlanarGraph, id: &EdgeId| {
            graph.edge(*id).map(|e| Flagged::from_edge(e, label))
        };

        let duplicates: Vec<Flagged> = findings
            .duplicates
            .iter()
            .filter_map(|id| flag(&graph, id))
            .collect();
        let overlaps: Vec<Flagged> = findings
            .overlaps
            .iter()
            .filter_map(|id| flag(&graph, id))
            .collect();
        let orphans: Vec<Flagged> = findings
            .orphans
            .iter()
            .filter_map(|id| flag(&graph, id))
            .collect();

        let edges_in = graph.len();
        graph.remove_edges(&findings.to_remove());

        info!(
            "Duplicate removal: {} edges -> {} edges ({} duplicates, {} overlaps, {} orphans)",
            edges_in,
            graph.len(),
            duplicates.len(),
            overlaps.len(),
            orphans.len()
        );

        DedupOutput {
            graph,
            duplicates,
            overlaps,
            orphans,
        }
    }

    pub fn resolve(&self, graph: PlanarGraph, control: &mut PassControl<'_>) -> DedupOutput {
        let findings = self.find(&graph, control);
        self.remove(graph, &findings)
    }
}
