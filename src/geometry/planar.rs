use super::{ExtractOptions, ExtractedEdge, GeometryService, Intersection, VertexKey};
use crate::attributes::Attributes;
use ahash::{AHashMap, AHashSet};
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
#[allow(deprecated)]
use geo::EuclideanLength;
use geo::{BoundingRect, Coord, Intersects, LineString, MultiLineString, Point, Relate};

/// `geo`-backed geometry service working on planar (projected) coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeometry;

impl GeometryService for PlanarGeometry {
    fn equal(&self, a: &LineString<f64>, b: &LineString<f64>) -> bool {
        if a.0 == b.0 || a.0.iter().eq(b.0.iter().rev()) {
            return true;
        }
        a.relate(b).is_equal_topo()
    }

    fn intersect(&self, a: &LineString<f64>, b: &LineString<f64>) -> Intersection {
        let mut points: Vec<Coord<f64>> = Vec::new();
        let mut overlaps: Vec<LineString<f64>> = Vec::new();
        let mut seen_overlaps: AHashSet<(VertexKey, VertexKey)> = AHashSet::new();

        for seg_a in a.lines() {
            let rect_a = seg_a.bounding_rect();
            for seg_b in b.lines() {
                if !rect_a.intersects(&seg_b.bounding_rect()) {
                    continue;
                }
                match line_intersection(seg_a, seg_b) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        points.push(intersection);
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        let start = VertexKey::from(intersection.start);
                        let end = VertexKey::from(intersection.end);
                        if start == end {
                            points.push(intersection.start);
                            continue;
                        }
                        let key = if start <= end { (start, end) } else { (end, start) };
                        if seen_overlaps.insert(key) {
                            overlaps.push(LineString::new(vec![
                                intersection.start,
                                intersection.end,
                            ]));
                        }
                    }
                    None => {}
                }
            }
        }

        let lines = merge_parts(overlaps);

        // Keep only points that are not already covered by an overlap
        let mut seen_points: AHashSet<VertexKey> = AHashSet::new();
        points.retain(|p| seen_points.insert(VertexKey::from(*p)));
        points.retain(|p| !lines.iter().any(|l| l.intersects(&Point::from(*p))));
        points.sort_by_key(|p| VertexKey::from(*p));

        match (lines.len(), points.len()) {
            (0, 0) => Intersection::Empty,
            (0, 1) => Intersection::Point(points[0]),
            (0, _) => Intersection::MultiPoint(points),
            (1, 0) => {
                let mut lines = lines;
                Intersection::Line(lines.remove(0))
            }
            _ => {
                let mut parts: Vec<Intersection> =
                    lines.into_iter().map(Intersection::Line).collect();
                parts.extend(points.into_iter().map(Intersection::Point));
                Intersection::Collection(parts)
            }
        }
    }

    fn combine(
        &self,
        a: &MultiLineString<f64>,
        b: &MultiLineString<f64>,
    ) -> MultiLineString<f64> {
        let mut parts: Vec<LineString<f64>> = a.0.clone();
        for part in &b.0 {
            if parts.iter().any(|existing| self.equal(existing, part)) {
                continue;
            }
            parts.push(part.clone());
        }
        MultiLineString::new(merge_parts(parts))
    }

    fn length(&self, a: &LineString<f64>) -> f64 {
        #[allow(deprecated)]
        a.euclidean_length()
    }

    fn extract_edges(
        &self,
        line: &LineString<f64>,
        attributes: &Attributes,
        options: ExtractOptions,
    ) -> Vec<ExtractedEdge> {
        let mut coords: Vec<Coord<f64>> = line
            .0
            .iter()
            .map(|c| round_coord(*c, options.tolerance))
            .collect();
        coords.dedup_by_key(|c| VertexKey::from(*c));

        if coords.len() < 2 {
            return Vec::new();
        }

        if options.simplify {
            let from = coords[0];
            let to = coords[coords.len() - 1];
            vec![ExtractedEdge {
                from,
                to,
                attributes: attributes.clone(),
                geometry: LineString::new(coords),
            }]
        } else {
            coords
                .windows(2)
                .map(|w| ExtractedEdge {
                    from: w[0],
                    to: w[1],
                    attributes: attributes.clone(),
                    geometry: LineString::new(w.to_vec()),
                })
                .collect()
        }
    }
}

fn round_coord(c: Coord<f64>, decimals: Option<u32>) -> Coord<f64> {
    match decimals {
        Some(d) => {
            let factor = 10f64.powi(d as i32);
            Coord {
                x: (c.x * factor).round() / factor,
                y: (c.y * factor).round() / factor,
            }
        }
        None => c,
    }
}

/// Joins line parts that meet end to end.
///
/// Two parts are joined at a shared endpoint only when no third part ends there,
/// so junctions stay part boundaries. Closed parts are never extended.
pub(crate) fn merge_parts(parts: Vec<LineString<f64>>) -> Vec<LineString<f64>> {
    let mut parts: Vec<Vec<Coord<f64>>> = parts
        .into_iter()
        .map(|p| p.0)
        .filter(|p| p.len() >= 2)
        .collect();

    loop {
        let mut endpoint_count: AHashMap<VertexKey, usize> = AHashMap::new();
        for part in &parts {
            *endpoint_count.entry(first_key(part)).or_default() += 1;
            *endpoint_count.entry(last_key(part)).or_default() += 1;
        }
        let joinable = |k: VertexKey| endpoint_count.get(&k).copied() == Some(2);

        let mut merged: Option<(usize, usize, Vec<Coord<f64>>)> = None;
        'search: for i in 0..parts.len() {
            if is_closed(&parts[i]) {
                continue;
            }
            for j in (i + 1)..parts.len() {
                if is_closed(&parts[j]) {
                    continue;
                }
                if let Some(joined) = join_pair(&parts[i], &parts[j], &joinable) {
                    merged = Some((i, j, joined));
                    break 'search;
                }
            }
        }

        match merged {
            Some((i, j, joined)) => {
                parts[i] = joined;
                parts.remove(j);
            }
            None => break,
        }
    }

    parts.into_iter().map(LineString::new).collect()
}

fn join_pair(
    a: &[Coord<f64>],
    b: &[Coord<f64>],
    joinable: &impl Fn(VertexKey) -> bool,
) -> Option<Vec<Coord<f64>>> {
    let (a0, a1) = (first_key(a), last_key(a));
    let (b0, b1) = (first_key(b), last_key(b));

    if a1 == b0 && joinable(a1) {
        Some(a.iter().chain(b.iter().skip(1)).copied().collect())
    } else if a1 == b1 && joinable(a1) {
        Some(a.iter().chain(b.iter().rev().skip(1)).copied().collect())
    } else if a0 == b1 && joinable(a0) {
        Some(b.iter().chain(a.iter().skip(1)).copied().collect())
    } else if a0 == b0 && joinable(a0) {
        Some(b.iter().rev().chain(a.iter().skip(1)).copied().collect())
    } else {
        None
    }
}

fn first_key(part: &[Coord<f64>]) -> VertexKey {
    VertexKey::from(part[0])
}

fn last_key(part: &[Coord<f64>]) -> VertexKey {
    VertexKey::from(part[part.len() - 1])
}

fn is_closed(part: &[Coord<f64>]) -> bool {
    first_key(part) == last_key(part)
}
