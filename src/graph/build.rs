use super::{Edge, EdgeId, PlanarGraph};
use crate::attributes::Attributes;
use crate::error::CleanError;
use crate::geometry::{ExtractOptions, GeometryService};
use crate::id_allocator::IdAllocator;
use ahash::AHashSet;
use geo::{Geometry, LineString};
use log::{info, warn};

/// An input feature: `(id, attributes, geometry)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: EdgeId,
    pub attributes: Attributes,
    pub geometry: Geometry<f64>,
}

impl Feature {
    pub fn new(id: EdgeId, attributes: Attributes, geometry: Geometry<f64>) -> Self {
        Self {
            id,
            attributes,
            geometry,
        }
    }
}

impl PlanarGraph {
    /// Builds the graph from ordered features.
    ///
    /// Only line and multi-line geometries are accepted; anything else is skipped and
    /// reported as [`CleanError::MalformedGeometry`]. Every extracted edge after the
    /// first of a feature gets a fresh id above the largest input id. A repeated
    /// feature id is reported as [`CleanError::InconsistentId`] and skipped.
    pub fn build<G: GeometryService>(
        features: Vec<Feature>,
        geometry: &G,
        options: ExtractOptions,
    ) -> (PlanarGraph, Vec<CleanError>) {
        let mut ids = IdAllocator::above(features.iter().map(|f| f.id).max());
        let mut seen: AHashSet<EdgeId> = AHashSet::with_capacity(features.len());
        let mut issues: Vec<CleanError> = Vec::new();
        let mut edges: Vec<Edge> = Vec::with_capacity(features.len());
        let feature_count = features.len();

        for feature in features {
            let type_name = geometry_type_name(&feature.geometry);
            let parts: Vec<LineString<f64>> = match feature.geometry {
                Geometry::LineString(ls) => vec![ls],
                Geometry::MultiLineString(mls) => mls.0,
                other => {
                    let geometry_type = geometry_type_name(&other).to_string();
                    warn!(
                        "Skipping feature {}: unsupported geometry type {}",
                        feature.id, geometry_type
                    );
                    issues.push(CleanError::MalformedGeometry {
                        id: feature.id,
                        geometry_type,
                    });
                    continue;
                }
            };

            if !seen.insert(feature.id) {
                warn!("Skipping feature {}: id already used", feature.id);
                issues.push(CleanError::InconsistentId { id: feature.id });
                continue;
            }

            let mut first = true;
            for part in &parts {
                for extracted in geometry.extract_edges(part, &feature.attributes, options) {
                    let id = if first { feature.id } else { ids.next_id() };
                    first = false;
                    edges.push(Edge::new(id, extracted.attributes, extracted.geometry));
                }
            }

            // no part had two distinct vertices
            if first {
                warn!("Skipping feature {}: degenerate {}", feature.id, type_name);
                issues.push(CleanError::MalformedGeometry {
                    id: feature.id,
                    geometry_type: format!("degenerate {}", type_name),
                });
            }
        }

        let mut graph = PlanarGraph {
            ids,
            ..PlanarGraph::default()
        };
        // Ids are unique by construction: input ids were deduplicated above and fresh
        // ids start above the input maximum.
        if let Err(e) = graph.add_edges(edges) {
            issues.push(e);
        }

        info!(
            "Built planar graph: {} features -> {} edges, {} vertices",
            feature_count,
            graph.len(),
            graph.adjacency().vertex_count()
        );

        (graph, issues)
    }
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
