use crate::graph::{Edge, EdgeId, PlanarGraph};
use geo::BoundingRect;
use rstar::{
    AABB, RTree,
    primitives::{GeomWithData, Rectangle},
};

/// Bounding-box candidate lookup over edges.
pub trait SpatialIndex {
    fn insert(&mut self, edge: &Edge);

    /// Ids of every indexed edge whose bounding box intersects `edge`'s, ascending.
    /// The edge itself is included if it was indexed.
    fn query_bounding_box(&self, edge: &Edge) -> Vec<EdgeId>;
}

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, EdgeId>;

/// R-tree backed [`SpatialIndex`].
pub struct RTreeIndex {
    tree: RTree<IndexedBox>,
}

impl RTreeIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk load every edge of the graph.
    pub fn from_graph(graph: &PlanarGraph) -> Self {
        let boxes: Vec<IndexedBox> = graph.edges().filter_map(edge_box).collect();
        Self {
            tree: RTree::bulk_load(boxes),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for RTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex for RTreeIndex {
    fn insert(&mut self, edge: &Edge) {
        if let Some(b) = edge_box(edge) {
            self.tree.insert(b);
        }
    }

    fn query_bounding_box(&self, edge: &Edge) -> Vec<EdgeId> {
        let envelope = match edge_envelope(edge) {
            Some(e) => e,
            None => return Vec::new(),
        };
        let mut ids: Vec<EdgeId> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|b| b.data)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn edge_corners(edge: &Edge) -> Option<([f64; 2], [f64; 2])> {
    let rect = edge.geometry.bounding_rect()?;
    Some((
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    ))
}

fn edge_box(edge: &Edge) -> Option<IndexedBox> {
    let (min, max) = edge_corners(edge)?;
    Some(GeomWithData::new(Rectangle::from_corners(min, max), edge.id))
}

fn edge_envelope(edge: &Edge) -> Option<AABB<[f64; 2]>> {
    let (min, max) = edge_corners(edge)?;
    Some(AABB::from_corners(min, max))
}
