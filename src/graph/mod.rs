// ===========================================================================
// Planar line graph
// ===========================================================================
//
// Edges are stored in insertion order; vertices are never stored on their own,
// they are derived from edge endpoints through the adjacency index. The index
// (and the id -> position map) is rebuilt from scratch after every structural
// mutation instead of being patched.
// ===========================================================================

mod build;

pub use crate::geometry::VertexKey;
pub use build::Feature;

use crate::attributes::Attributes;
use crate::error::CleanError;
use crate::id_allocator::IdAllocator;
use ahash::{AHashMap, AHashSet};
use geo::{Coord, LineString};

pub type EdgeId = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub attributes: Attributes,
    pub geometry: LineString<f64>,
}

impl Edge {
    pub fn new(id: EdgeId, attributes: Attributes, geometry: LineString<f64>) -> Self {
        Self {
            id,
            attributes,
            geometry,
        }
    }

    pub fn vertices(&self) -> &[Coord<f64>] {
        &self.geometry.0
    }

    pub fn start(&self) -> VertexKey {
        VertexKey::from(self.geometry.0[0])
    }

    pub fn end(&self) -> VertexKey {
        VertexKey::from(self.geometry.0[self.geometry.0.len() - 1])
    }

    pub fn is_self_loop(&self) -> bool {
        self.start() == self.end()
    }

    /// The endpoint at the other side of `v`. For a self-loop this is `v` itself.
    pub fn opposite(&self, v: VertexKey) -> VertexKey {
        if self.start() == v { self.end() } else { self.start() }
    }

    /// Endpoints as an unordered pair, smaller vertex first.
    pub fn endpoint_pair(&self) -> (VertexKey, VertexKey) {
        let (a, b) = (self.start(), self.end());
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// Vertex -> incident edge ids. A self-loop is listed twice at its vertex.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    incident: AHashMap<VertexKey, Vec<EdgeId>>,
    /// Vertices in the order they were first met while scanning edges.
    order: Vec<VertexKey>,
}

impl AdjacencyIndex {
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut index = Self::default();
        for edge in edges {
            index.push(edge.start(), edge.id);
            index.push(edge.end(), edge.id);
        }
        index
    }

    fn push(&mut self, v: VertexKey, id: EdgeId) {
        let entry = self.incident.entry(v).or_insert_with(|| {
            self.order.push(v);
            Vec::new()
        });
        entry.push(id);
    }

    pub fn incident(&self, v: &VertexKey) -> &[EdgeId] {
        self.incident.get(v).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    pub fn degree(&self, v: &VertexKey) -> usize {
        self.incident(v).len()
    }

    /// Vertices in first-seen order.
    pub fn vertices(&self) -> impl Iterator<Item = &VertexKey> {
        self.order.iter()
    }

    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanarGraph {
    edges: Vec<Edge>,
    positions: AHashMap<EdgeId, usize>,
    adjacency: AdjacencyIndex,
    ids: IdAllocator,
}

impl PlanarGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.positions.get(&id).map(|&pos| &self.edges[pos])
    }

    pub fn contains(&self, id: EdgeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn degree(&self, v: &VertexKey) -> usize {
        self.adjacency.degree(v)
    }

    pub fn adjacency(&self) -> &AdjacencyIndex {
        &self.adjacency
    }

    pub fn max_id(&self) -> Option<EdgeId> {
        self.edges.iter().map(|e| e.id).max()
    }

    /// Fresh id strictly above every id this graph has ever held.
    pub fn next_id(&mut self) -> EdgeId {
        self.ids.next_id()
    }

    /// Removes the given edges and returns them in graph order. Unknown ids are ignored.
    pub fn remove_edges(&mut self, ids: &[EdgeId]) -> Vec<Edge> {
        let doomed: AHashSet<EdgeId> = ids.iter().copied().collect();
        if doomed.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| doomed.contains(&e.id));
        self.edges = kept;
        self.reindex();
        removed
    }

    /// Appends edges. Fails without modifying the graph if any id is already present
    /// (or repeated within `edges`), or if an edge has fewer than two vertices.
    pub fn add_edges(&mut self, edges: Vec<Edge>) -> Result<(), CleanError> {
        let mut incoming: AHashSet<EdgeId> = AHashSet::with_capacity(edges.len());
        for edge in &edges {
            if edge.geometry.0.len() < 2 {
                return Err(CleanError::MalformedGeometry {
                    id: edge.id,
                    geometry_type: "degenerate LineString".to_string(),
                });
            }
            if self.positions.contains_key(&edge.id) || !incoming.insert(edge.id) {
                return Err(CleanError::InconsistentId { id: edge.id });
            }
        }
        for edge in &edges {
            self.ids.observe(edge.id);
        }
        self.edges.extend(edges);
        self.reindex();
        Ok(())
    }

    /// Applies `f` to every edge's attributes. Geometry and ids are untouched, so
    /// no reindexing is needed.
    pub fn update_attributes(&mut self, mut f: impl FnMut(EdgeId, &mut Attributes)) {
        for edge in &mut self.edges {
            f(edge.id, &mut edge.attributes);
        }
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    fn reindex(&mut self) {
        self.positions = self
            .edges
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id, pos))
            .collect();
        self.adjacency = AdjacencyIndex::from_edges(&self.edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: EdgeId, points: &[(f64, f64)]) -> Edge {
        Edge::new(
            id,
            Attributes::new(),
            LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect()),
        )
    }

    #[test]
    fn test_degree_and_adjacency() {
        let mut g = PlanarGraph::new();
        g.add_edges(vec![
            edge(1, &[(0.0, 0.0), (1.0, 0.0)]),
            edge(2, &[(1.0, 0.0), (2.0, 0.0)]),
            edge(3, &[(2.0, 0.0), (2.0, 1.0), (2.0, 0.0)]),
        ])
        .unwrap();

        assert_eq!(g.degree(&VertexKey::new(0.0, 0.0)), 1);
        assert_eq!(g.degree(&VertexKey::new(1.0, 0.0)), 2);
        // edge 2 plus the self-loop counted twice
        assert_eq!(g.degree(&VertexKey::new(2.0, 0.0)), 3);
        assert_eq!(g.adjacency().incident(&VertexKey::new(2.0, 0.0)), &[2, 3, 3]);
        assert_eq!(g.adjacency().vertex_count(), 3);
        assert!(g.edge(3).map(|e| e.is_self_loop()).unwrap_or(false));
    }

    #[test]
    fn test_remove_rebuilds_adjacency() {
        let mut g = PlanarGraph::new();
        g.add_edges(vec![
            edge(1, &[(0.0, 0.0), (1.0, 0.0)]),
            edge(2, &[(1.0, 0.0), (2.0, 0.0)]),
        ])
        .unwrap();

        let removed = g.remove_edges(&[2, 99]);
        assert_eq!(removed.len(), 1);
        assert_eq!(g.len(), 1);
        assert_eq!(g.degree(&VertexKey::new(2.0, 0.0)), 0);
        assert_eq!(g.degree(&VertexKey::new(1.0, 0.0)), 1);
        assert!(g.edge(2).is_none());
        assert_eq!(g.edge(1).map(|e| e.id), Some(1));
    }

    #[test]
    fn test_add_rejects_existing_id() {
        let mut g = PlanarGraph::new();
        g.add_edges(vec![edge(1, &[(0.0, 0.0), (1.0, 0.0)])]).unwrap();
        let err = g
            .add_edges(vec![
                edge(2, &[(5.0, 0.0), (6.0, 0.0)]),
                edge(1, &[(3.0, 0.0), (4.0, 0.0)]),
            ])
            .unwrap_err();
        assert_eq!(err, CleanError::InconsistentId { id: 1 });
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_add_rejects_short_polylines() {
        let mut g = PlanarGraph::new();
        g.add_edges(vec![edge(1, &[(0.0, 0.0), (1.0, 0.0)])]).unwrap();

        let err = g
            .add_edges(vec![edge(2, &[(5.0, 0.0), (6.0, 0.0)]), edge(3, &[])])
            .unwrap_err();
        assert_eq!(err.edge_id(), Some(3));
        assert!(matches!(err, CleanError::MalformedGeometry { .. }));

        let err = g.add_edges(vec![edge(4, &[(2.0, 2.0)])]).unwrap_err();
        assert_eq!(err.edge_id(), Some(4));
        assert_eq!(g.edge_ids(), vec![1]);
    }

    #[test]
    fn test_next_id_stays_above_removed_ids() {
        let mut g = PlanarGraph::new();
        g.add_edges(vec![
            edge(4, &[(0.0, 0.0), (1.0, 0.0)]),
            edge(8, &[(1.0, 0.0), (2.0, 0.0)]),
        ])
        .unwrap();
        g.remove_edges(&[8]);
        assert_eq!(g.next_id(), 9);
        assert_eq!(g.next_id(), 10);
    }

    #[test]
    fn test_endpoint_pair_is_canonical() {
        let a = edge(1, &[(3.0, 1.0), (0.0, 5.0)]);
        let b = edge(2, &[(0.0, 5.0), (1.0, 9.0), (3.0, 1.0)]);
        assert_eq!(a.endpoint_pair(), b.endpoint_pair());
        assert_eq!(a.endpoint_pair().0, VertexKey::new(0.0, 5.0));
    }
}
