//! Fixtures shared by the unit tests.

use crate::attributes::{AttrValue, Attributes};
use crate::graph::{Edge, EdgeId, PlanarGraph};
use geo::{Coord, LineString};

pub fn line(points: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(points.iter().map(|&(x, y)| Coord { x, y }).collect())
}

pub fn edge(id: EdgeId, points: &[(f64, f64)]) -> Edge {
    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), AttrValue::Text(format!("road {}", id)));
    Edge::new(id, attributes, line(points))
}

pub fn graph(edges: Vec<Edge>) -> PlanarGraph {
    let mut g = PlanarGraph::new();
    g.add_edges(edges).expect("fixture ids are unique");
    g
}

/// Vertex list of an edge as plain tuples, for compact assertions.
pub fn coords(edge: &Edge) -> Vec<(f64, f64)> {
    edge.vertices().iter().map(|c| (c.x, c.y)).collect()
}
