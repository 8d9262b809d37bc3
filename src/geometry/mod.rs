//! Geometry seam of the cleaner.
//!
//! Every pass talks to geometry through [`GeometryService`], so the graph logic never
//! depends on a particular intersection or union implementation. [`PlanarGeometry`]
//! is the `geo`-backed implementation used by default.

mod planar;

pub use planar::PlanarGeometry;

use crate::attributes::Attributes;
use geo::{Coord, LineString, MultiLineString};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact coordinate identity of a vertex.
///
/// Ordering is lexicographic by x then y, which gives the total order used for
/// canonical endpoint pairs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
}

impl VertexKey {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x.into_inner(),
            y: self.y.into_inner(),
        }
    }
}

impl From<Coord<f64>> for VertexKey {
    fn from(c: Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl fmt::Debug for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Shape of the intersection of two line geometries.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    Empty,
    Point(Coord<f64>),
    MultiPoint(Vec<Coord<f64>>),
    Line(LineString<f64>),
    /// Mixed or multi-line result: lines first, then isolated points.
    Collection(Vec<Intersection>),
}

impl Intersection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Intersection::Empty)
    }

    /// True when any part of the intersection is line-shaped (a collinear overlap).
    pub fn has_line(&self) -> bool {
        match self {
            Intersection::Line(_) => true,
            Intersection::Collection(parts) => parts.iter().any(|p| p.has_line()),
            _ => false,
        }
    }
}

/// How polylines are turned into graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Number of decimal places coordinates are rounded to, if any.
    pub tolerance: Option<u32>,
    /// One edge per polyline when true, one edge per segment when false.
    pub simplify: bool,
}

impl ExtractOptions {
    pub fn new(tolerance: Option<u32>, simplify: bool) -> Self {
        Self {
            tolerance,
            simplify,
        }
    }
}

/// An edge produced by [`GeometryService::extract_edges`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEdge {
    pub from: Coord<f64>,
    pub to: Coord<f64>,
    pub attributes: Attributes,
    pub geometry: LineString<f64>,
}

impl ExtractedEdge {
    /// Both endpoints are the same coordinate.
    pub fn is_degenerate(&self) -> bool {
        VertexKey::from(self.from) == VertexKey::from(self.to)
    }
}

pub trait GeometryService {
    /// Exact (topological) equality of two lines.
    fn equal(&self, a: &LineString<f64>, b: &LineString<f64>) -> bool;

    fn intersect(&self, a: &LineString<f64>, b: &LineString<f64>) -> Intersection;

    /// Union of two line geometries. Parts that meet end to end are joined.
    fn combine(&self, a: &MultiLineString<f64>, b: &MultiLineString<f64>)
    -> MultiLineString<f64>;

    fn length(&self, a: &LineString<f64>) -> f64;

    fn extract_edges(
        &self,
        line: &LineString<f64>,
        attributes: &Attributes,
        options: ExtractOptions,
    ) -> Vec<ExtractedEdge>;
}

/// True when `point` is exactly one of `line`'s vertices.
pub fn is_vertex(line: &LineString<f64>, point: Coord<f64>) -> bool {
    let key = VertexKey::from(point);
    line.0.iter().any(|c| VertexKey::from(*c) == key)
}

/// Index of the first vertex of `vertices` exactly equal to `point`.
pub fn find_vertex_index(vertices: &[Coord<f64>], point: Coord<f64>) -> Option<usize> {
    let key = VertexKey::from(point);
    vertices.iter().position(|c| VertexKey::from(*c) == key)
}
