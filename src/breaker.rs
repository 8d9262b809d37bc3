// ===========================================================================
// Edge breaking at unresolved intersections
// ===========================================================================
//
// Two phases:
// 1. Detection, read-only against the current graph: every edge is intersected
//    with its bounding-box candidates and the points where another edge
//    touches or crosses it without a shared vertex are collected.
// 2. Mutation, serial: broken edges are removed, split at those points and
//    their sub-edges added back with fresh ids.
//
// Per edge: UNEXAMINED -> UNCHANGED, or UNEXAMINED -> SPLIT with every
// sub-edge UNCHANGED.
// ===========================================================================

use crate::attributes::AttrValue;
use crate::control::PassControl;
use crate::error::CleanError;
use crate::geometry::{
    ExtractOptions, GeometryService, Intersection, VertexKey, find_vertex_index, is_vertex,
};
use crate::graph::{Edge, EdgeId, PlanarGraph};
use crate::report::Flagged;
use crate::spatial_index::{RTreeIndex, SpatialIndex};
use ahash::{AHashMap, AHashSet};
#[allow(deprecated)]
use geo::EuclideanDistance;
use geo::{Coord, Line, LineString, Point};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakageKind {
    /// Another edge crosses or touches the interior.
    Inter,
    /// End of a collinear stretch shared with another edge.
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeState {
    Unexamined,
    Unchanged,
    Split,
}

/// Interior points at which one edge has to be broken.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakage {
    pub edge: EdgeId,
    /// Distinct points, none of them an existing vertex of the edge.
    pub points: Vec<Coord<f64>>,
    pub kinds: BTreeSet<BreakageKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakageReport {
    pub edge: Flagged,
    pub kinds: BTreeSet<BreakageKind>,
    pub parts: Vec<EdgeId>,
}

#[derive(Debug)]
pub struct Detection {
    pub breakages: Vec<Breakage>,
    /// Edges looked at before detection stopped, in graph order.
    pub examined: Vec<EdgeId>,
    pub complete: bool,
}

#[derive(Debug)]
pub struct BreakOutput {
    pub graph: PlanarGraph,
    pub breakages: Vec<BreakageReport>,
    pub states: BTreeMap<EdgeId, EdgeState>,
    pub issues: Vec<CleanError>,
    pub complete: bool,
}

pub struct EdgeBreaker<'g, G: GeometryService> {
    geometry: &'g G,
    options: ExtractOptions,
    alias_field: String,
    label_field: Option<String>,
}

impl<'g, G: GeometryService> EdgeBreaker<'g, G> {
    pub fn new(geometry: &'g G) -> Self {
        Self {
            geometry,
            options: ExtractOptions::new(None, true),
            alias_field: "broken_id".to_string(),
            label_field: None,
        }
    }

    /// Tolerance and simplification used when sub-edges are re-extracted.
    pub fn extract_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn alias_field(mut self, field: impl Into<String>) -> Self {
        self.alias_field = field.into();
        self
    }

    pub fn label_field(mut self, field: Option<String>) -> Self {
        self.label_field = field;
        self
    }

    /// Points where `other` meets `edge` away from `edge`'s vertices.
    pub fn breakage_points(
        &self,
        edge: &Edge,
        other: &Edge,
    ) -> Vec<(Coord<f64>, BreakageKind)> {
        // same argument order for both sides of a pair, so both edges get
        // bit-identical split points
        let intersection = if edge.id <= other.id {
            self.geometry.intersect(&edge.geometry, &other.geometry)
        } else {
            self.geometry.intersect(&other.geometry, &edge.geometry)
        };
        let mut points = Vec::new();
        collect_points(&edge.geometry, &intersection, &mut points);
        points
    }

    pub fn find_breakages(
        &self,
        graph: &PlanarGraph,
        control: &mut PassControl<'_>,
    ) -> Detection {
        let index = RTreeIndex::from_graph(graph);
        let total = graph.len();
        let mut detection = Detection {
            breakages: Vec::new(),
            examined: Vec::with_capacity(total),
            complete: true,
        };

        for (i, edge) in graph.edges().enumerate() {
            if control.is_cancelled() {
                warn!("Edge breaking cancelled after {} of {} edges", i, total);
                detection.complete = false;
                break;
            }
            control.progress(i, total);
            detection.examined.push(edge.id);

            let mut seen: AHashSet<VertexKey> = AHashSet::new();
            let mut points: Vec<Coord<f64>> = Vec::new();
            let mut kinds: BTreeSet<BreakageKind> = BTreeSet::new();

            for other_id in index.query_bounding_box(edge) {
                if other_id == edge.id {
                    continue;
                }
                let Some(other) = graph.edge(other_id) else {
                    continue;
                };
                for (point, kind) in self.breakage_points(edge, other) {
                    kinds.insert(kind);
                    if seen.insert(VertexKey::from(point)) {
                        points.push(point);
                    }
                }
            }

            if !points.is_empty() {
                debug!("Edge {}: {} breakage points {:?}", edge.id, points.len(), kinds);
                detection.breakages.push(Breakage {
                    edge: edge.id,
                    points,
                    kinds,
                });
            }
        }

        detection
    }

    /// Cuts `edge` into one sub-edge per consecutive pair of `indices` into
    /// `vertices` (the edge's vertex list with breakage points inserted).
    ///
    /// Each sub-edge inherits the edge's attributes plus the alias label
    /// `"<id>_br_<group>_<part>"`, and is re-extracted through the geometry service.
    /// Sub-edges whose endpoints coincide are dropped.
    pub fn split(
        &self,
        edge: &Edge,
        vertices: &[Coord<f64>],
        indices: &[usize],
        group: usize,
        next_id: &mut impl FnMut() -> EdgeId,
    ) -> Vec<Edge> {
        let mut parts = Vec::with_capacity(indices.len().saturating_sub(1));

        for (part, window) in indices.windows(2).enumerate() {
            let (from, to) = (window[0], window[1]);
            if from >= to || to >= vertices.len() {
                continue;
            }
            let sub = LineString::new(vertices[from..=to].to_vec());
            let mut attributes = edge.attributes.clone();
            attributes.insert(
                self.alias_field.clone(),
                AttrValue::Text(format!("{}_br_{}_{}", edge.id, group, part + 1)),
            );

            for extracted in self.geometry.extract_edges(&sub, &attributes, self.options) {
                if extracted.is_degenerate() {
                    continue;
                }
                parts.push(Edge::new(next_id(), extracted.attributes, extracted.geometry));
            }
        }

        parts
    }

    pub fn break_graph(
        &self,
        mut graph: PlanarGraph,
        control: &mut PassControl<'_>,
    ) -> Result<BreakOutput, CleanError> {
        let edges_in = graph.len();
        let detection = self.find_breakages(&graph, control);

        let mut states: BTreeMap<EdgeId, EdgeState> = graph
            .edges()
            .map(|e| (e.id, EdgeState::Unexamined))
            .collect();
        for id in &detection.examined {
            states.insert(*id, EdgeState::Unchanged);
        }

        let by_edge: AHashMap<EdgeId, &Breakage> =
            detection.breakages.iter().map(|b| (b.edge, b)).collect();
        let broken_ids: Vec<EdgeId> = detection.breakages.iter().map(|b| b.edge).collect();
        let broken = graph.remove_edges(&broken_ids);

        let alias = self.alias_field.clone();
        graph.update_attributes(|id, attributes| {
            attributes.insert(alias.clone(), AttrValue::Text(id.to_string()));
        });

        let label = self.label_field.as_deref();
        let mut reports: Vec<BreakageReport> = Vec::with_capacity(broken.len());
        let mut new_edges: Vec<Edge> = Vec::new();

        for (group, edge) in broken.iter().enumerate() {
            let Some(breakage) = by_edge.get(&edge.id) else {
                continue;
            };
            let vertices = insert_points(edge.vertices(), &breakage.points);
            let indices = split_indices(&vertices, &breakage.points);
            let parts = self.split(edge, &vertices, &indices, group + 1, &mut || {
                graph.next_id()
            });

            states.insert(edge.id, EdgeState::Split);
            for part in &parts {
                states.insert(part.id, EdgeState::Unchanged);
            }
            reports.push(BreakageReport {
                edge: Flagged::from_edge(edge, label),
                kinds: breakage.kinds.clone(),
                parts: parts.iter().map(|p| p.id).collect(),
            });
            new_edges.extend(parts);
        }

        graph.add_edges(new_edges)?;

        let mut issues = Vec::new();
        if detection.complete {
            control.report(1.0);
        } else {
            issues.push(CleanError::CancellationRequested { pass: "break" });
        }

        info!(
            "Edge breaking: {} edges -> {} edges ({} edges split)",
            edges_in,
            graph.len(),
            reports.len()
        );

        Ok(BreakOutput {
            graph,
            breakages: reports,
            states,
            issues,
            complete: detection.complete,
        })
    }
}

fn collect_points(
    line: &LineString<f64>,
    intersection: &Intersection,
    out: &mut Vec<(Coord<f64>, BreakageKind)>,
) {
    match intersection {
        Intersection::Empty => {}
        Intersection::Point(p) => {
            if !is_vertex(line, *p) {
                out.push((*p, BreakageKind::Inter));
            }
        }
        Intersection::MultiPoint(points) => {
            for p in points {
                if !is_vertex(line, *p) {
                    out.push((*p, BreakageKind::Inter));
                }
            }
        }
        Intersection::Line(overlap) => {
            let ends = [overlap.0.first(), overlap.0.last()];
            for p in ends.into_iter().flatten() {
                if !is_vertex(line, *p) {
                    out.push((*p, BreakageKind::Overlap));
                }
            }
        }
        Intersection::Collection(parts) => {
            for part in parts {
                collect_points(line, part, out);
            }
        }
    }
}

/// Inserts each point into the vertex list on the segment closest to it, keeping
/// points on the same segment ordered by distance from the segment start.
fn insert_points(vertices: &[Coord<f64>], points: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut placed: Vec<(usize, f64, Coord<f64>)> = points
        .iter()
        .filter(|p| find_vertex_index(vertices, **p).is_none())
        .filter_map(|p| {
            let (segment, _) = vertices
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    #[allow(deprecated)]
                    let d = Line::new(w[0], w[1]).euclidean_distance(&Point::from(*p));
                    (i, d)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            let start = vertices[segment];
            Some((segment, (p.x - start.x).hypot(p.y - start.y), *p))
        })
        .collect();
    placed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut out: Vec<Coord<f64>> = Vec::with_capacity(vertices.len() + placed.len());
    let mut pending = placed.into_iter().peekable();
    for (i, v) in vertices.iter().enumerate() {
        out.push(*v);
        while let Some((_, _, p)) = pending.next_if(|(segment, _, _)| *segment == i) {
            out.push(p);
        }
    }
    out
}

/// Exact positions of the breakage points, plus the first and last index.
fn split_indices(vertices: &[Coord<f64>], points: &[Coord<f64>]) -> Vec<usize> {
    let mut indices: Vec<usize> = points
        .iter()
        .filter_map(|p| find_vertex_index(vertices, *p))
        .collect();
    indices.push(0);
    indices.push(vertices.len().saturating_sub(1));
    indices.sort_unstable();
    indices.dedup();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancelFlag;
    use crate::geometry::PlanarGeometry;
    use crate::test_support::{coords, edge, graph};

    fn breaker() -> EdgeBreaker<'static, PlanarGeometry> {
        EdgeBreaker::new(&PlanarGeometry)
    }

    fn alias(e: &Edge) -> Option<String> {
        match e.attributes.get("broken_id") {
            Some(AttrValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_crossing_edges_are_split() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (5.0, 0.0)]),
            edge(2, &[(2.0, -1.0), (2.0, 1.0)]),
        ]);
        let out = breaker().break_graph(g, &mut PassControl::default()).unwrap();

        assert!(out.complete);
        assert_eq!(out.graph.edge_ids(), vec![3, 4, 5, 6]);
        assert_eq!(coords(out.graph.edge(3).unwrap()), vec![(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(coords(out.graph.edge(4).unwrap()), vec![(2.0, 0.0), (5.0, 0.0)]);
        assert_eq!(alias(out.graph.edge(3).unwrap()).as_deref(), Some("1_br_1_1"));
        assert_eq!(alias(out.graph.edge(6).unwrap()).as_deref(), Some("2_br_2_2"));

        assert_eq!(out.breakages.len(), 2);
        assert_eq!(out.breakages[0].edge.id, 1);
        assert_eq!(
            out.breakages[0].kinds,
            BTreeSet::from([BreakageKind::Inter])
        );
        assert_eq!(out.breakages[0].parts, vec![3, 4]);
        assert_eq!(out.states.get(&1), Some(&EdgeState::Split));
        assert_eq!(out.states.get(&4), Some(&EdgeState::Unchanged));
    }

    #[test]
    fn test_t_junction_only_breaks_the_through_edge() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (4.0, 0.0)]),
            edge(2, &[(2.0, 0.0), (2.0, 3.0)]),
        ]);
        let out = breaker().break_graph(g, &mut PassControl::default()).unwrap();

        assert_eq!(out.graph.edge_ids(), vec![2, 3, 4]);
        assert_eq!(alias(out.graph.edge(2).unwrap()).as_deref(), Some("2"));
        assert_eq!(out.states.get(&2), Some(&EdgeState::Unchanged));
        assert_eq!(out.graph.degree(&VertexKey::new(2.0, 0.0)), 3);
    }

    #[test]
    fn test_noded_network_is_untouched() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (2.0, 0.0)]),
            edge(2, &[(2.0, 0.0), (4.0, 0.0)]),
            edge(3, &[(2.0, 0.0), (2.0, 2.0)]),
        ]);
        let out = breaker().break_graph(g, &mut PassControl::default()).unwrap();
        assert!(out.breakages.is_empty());
        assert_eq!(out.graph.edge_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_overlap_ends_become_breakages() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (10.0, 0.0)]),
            edge(2, &[(5.0, 0.0), (15.0, 0.0)]),
        ]);
        let out = breaker().break_graph(g, &mut PassControl::default()).unwrap();

        assert_eq!(
            out.breakages[0].kinds,
            BTreeSet::from([BreakageKind::Overlap])
        );
        let pieces: Vec<Vec<(f64, f64)>> = out.graph.edges().map(coords).collect();
        assert_eq!(
            pieces,
            vec![
                vec![(0.0, 0.0), (5.0, 0.0)],
                vec![(5.0, 0.0), (10.0, 0.0)],
                vec![(5.0, 0.0), (10.0, 0.0)],
                vec![(10.0, 0.0), (15.0, 0.0)],
            ]
        );
    }

    #[test]
    fn test_multiple_crossings_cover_parent_range() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (4.0, 0.0), (10.0, 0.0)]),
            edge(2, &[(2.0, -1.0), (4.0, 1.0), (6.0, -1.0)]),
        ]);
        let out = breaker().break_graph(g, &mut PassControl::default()).unwrap();
        let report = &out.breakages[0];
        assert_eq!(report.edge.id, 1);

        let parts: Vec<&Edge> = report
            .parts
            .iter()
            .filter_map(|id| out.graph.edge(*id))
            .collect();
        assert_eq!(parts.len(), 3);
        // consecutive parts share their boundary vertex, and together they run
        // from the parent's first vertex to its last
        assert_eq!(parts[0].start(), VertexKey::new(0.0, 0.0));
        assert_eq!(parts[2].end(), VertexKey::new(10.0, 0.0));
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        // the original (4,0) vertex stays inside the middle part
        assert_eq!(parts[1].vertices().len(), 3);
    }

    #[test]
    fn test_degenerate_sub_edges_are_dropped() {
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (10.0, 0.0)]),
            edge(2, &[(0.001, -1.0), (0.001, 1.0)]),
        ]);
        let out = breaker()
            .extract_options(ExtractOptions::new(Some(2), true))
            .break_graph(g, &mut PassControl::default())
            .unwrap();

        for e in out.graph.edges() {
            assert!(!e.is_self_loop(), "edge {} is degenerate", e.id);
        }
        assert_eq!(out.breakages[0].parts.len(), 1);
    }

    #[test]
    fn test_cancellation_leaves_graph_unsplit() {
        let flag = CancelFlag::new();
        flag.cancel();
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (5.0, 0.0)]),
            edge(2, &[(2.0, -1.0), (2.0, 1.0)]),
        ]);
        let out = breaker()
            .break_graph(g, &mut PassControl::new(flag))
            .unwrap();
        assert!(!out.complete);
        assert_eq!(out.graph.edge_ids(), vec![1, 2]);
        assert_eq!(out.states.get(&1), Some(&EdgeState::Unexamined));
        assert_eq!(
            out.issues,
            vec![CleanError::CancellationRequested { pass: "break" }]
        );
    }

    #[test]
    fn test_cancellation_applies_breakages_found_so_far() {
        let flag = CancelFlag::new();
        let trigger = flag.clone();
        // the flag goes up while the second edge is being examined
        let mut control = PassControl::new(flag).with_progress(move |f| {
            if f > 0.0 {
                trigger.cancel();
            }
        });
        let g = graph(vec![
            edge(1, &[(0.0, 0.0), (5.0, 0.0)]),
            edge(2, &[(2.0, -1.0), (2.0, 1.0)]),
            edge(3, &[(10.0, 0.0), (15.0, 0.0)]),
            edge(4, &[(12.0, -1.0), (12.0, 1.0)]),
        ]);
        let out = breaker().break_graph(g, &mut control).unwrap();

        assert!(!out.complete);
        assert_eq!(
            out.breakages.iter().map(|b| b.edge.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(out.graph.edge_ids(), vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(coords(out.graph.edge(5).unwrap()), vec![(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(out.states.get(&1), Some(&EdgeState::Split));
        assert_eq!(out.states.get(&3), Some(&EdgeState::Unexamined));
        assert_eq!(alias(out.graph.edge(3).unwrap()).as_deref(), Some("3"));
        assert_eq!(
            out.issues,
            vec![CleanError::CancellationRequested { pass: "break" }]
        );
    }

    #[test]
    fn test_insert_points_orders_along_segment() {
        let vertices = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }];
        let points = vec![Coord { x: 7.0, y: 0.0 }, Coord { x: 3.0, y: 0.0 }];
        let out = insert_points(&vertices, &points);
        let xs: Vec<f64> = out.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 7.0, 10.0]);
        assert_eq!(split_indices(&out, &points), vec![0, 1, 2, 3]);
    }
}
