//! Properties that span more than one pass.

use crate::attributes::Attributes;
use crate::breaker::EdgeBreaker;
use crate::chain_merge::ChainMerger;
use crate::cleaner::Cleaner;
use crate::config::CleanerConfig;
use crate::control::PassControl;
use crate::duplicates::DuplicateResolver;
use crate::geometry::{ExtractOptions, PlanarGeometry};
use crate::graph::{EdgeId, Feature, PlanarGraph};
use crate::test_support::{edge, graph, line};
use ahash::AHashSet;
use geo::Geometry;

/// A small town grid with the usual digitising faults: an unnoded crossing,
/// a duplicated street, an overlapping stub, a dangling chain and a loop.
fn messy_features() -> Vec<Feature> {
    let shapes: Vec<(EdgeId, Vec<(f64, f64)>)> = vec![
        (10, vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]),
        (11, vec![(5.0, -5.0), (5.0, 0.0)]),
        (12, vec![(5.0, 0.0), (5.0, 5.0)]),
        // crosses 10 without a vertex
        (13, vec![(7.5, -2.0), (7.5, 2.0)]),
        // duplicate of 11, reversed
        (14, vec![(5.0, 0.0), (5.0, -5.0)]),
        // overlaps the western half of 10
        (15, vec![(1.0, 0.0), (3.0, 0.0)]),
        // dangling chain off the top of 12
        (16, vec![(5.0, 5.0), (6.0, 6.0)]),
        (17, vec![(6.0, 6.0), (7.0, 6.0)]),
        (18, vec![(7.0, 6.0), (8.0, 7.0)]),
        // closed loop hanging off (0,0)
        (19, vec![(0.0, 0.0), (-1.0, 1.0), (-2.0, 0.0), (0.0, 0.0)]),
    ];
    shapes
        .into_iter()
        .map(|(id, pts)| {
            let mut attributes = Attributes::new();
            attributes.insert("name".to_string(), format!("street {}", id).into());
            Feature::new(id, attributes, Geometry::LineString(line(&pts)))
        })
        .collect()
}

fn built() -> PlanarGraph {
    let (g, issues) = PlanarGraph::build(
        messy_features(),
        &PlanarGeometry,
        ExtractOptions::new(None, true),
    );
    assert!(issues.is_empty());
    g
}

#[test]
fn test_output_ids_are_original_or_fresh() {
    let features = messy_features();
    let input_ids: AHashSet<EdgeId> = features.iter().map(|f| f.id).collect();
    let max_in = features.iter().map(|f| f.id).max().unwrap();

    let out = Cleaner::new(CleanerConfig::default(), &PlanarGeometry)
        .run(features, &mut PassControl::default())
        .unwrap();

    let mut seen: AHashSet<EdgeId> = AHashSet::new();
    for e in &out.edges {
        assert!(seen.insert(e.id), "id {} emitted twice", e.id);
        assert!(
            input_ids.contains(&e.id) || e.id > max_in,
            "id {} is neither original nor fresh",
            e.id
        );
    }
    assert!(out.report.complete);
}

#[test]
fn test_full_run_leaves_no_zero_length_edges() {
    let out = Cleaner::new(CleanerConfig::default(), &PlanarGeometry)
        .run(messy_features(), &mut PassControl::default())
        .unwrap();
    for e in &out.edges {
        assert!(e.vertices().len() >= 2);
        assert!(
            !(e.is_self_loop() && e.vertices().len() < 4),
            "edge {} collapsed",
            e.id
        );
    }
}

#[test]
fn test_dedupe_after_break_is_idempotent() {
    let mut control = PassControl::default();
    let broken = EdgeBreaker::new(&PlanarGeometry)
        .break_graph(built(), &mut control)
        .unwrap();

    let resolver = DuplicateResolver::new(&PlanarGeometry);
    let once = resolver.resolve(broken.graph, &mut PassControl::default());
    // 14 duplicates 11; the broken piece of 10 under 15 duplicates 15
    let removed: Vec<EdgeId> = once.duplicates.iter().map(|f| f.id).collect();
    assert_eq!(removed.len(), 2);
    assert!(removed.contains(&14));
    assert!(once.graph.contains(15));

    let snapshot = once.graph.clone().into_edges();
    let twice = resolver.resolve(once.graph, &mut PassControl::default());
    assert!(twice.duplicates.is_empty());
    assert!(twice.overlaps.is_empty());
    assert_eq!(twice.graph.into_edges(), snapshot);
}

#[test]
fn test_second_merge_is_a_no_op() {
    let merger = ChainMerger::new(&PlanarGeometry).merge_attributes(false);
    let first = merger.merge(built(), &mut PassControl::default()).unwrap();
    assert!(!first.chains.is_empty());

    let snapshot = first.graph.clone().into_edges();
    let second = merger.merge(first.graph, &mut PassControl::default()).unwrap();
    assert!(second.chains.is_empty());
    assert_eq!(second.graph.into_edges(), snapshot);
}

#[test]
fn test_self_loop_is_never_a_chain_step() {
    // (0,0) has the loop (counted twice) and edge 1: degree 3, a junction
    let g = graph(vec![
        edge(1, &[(0.0, 0.0), (1.0, 0.0)]),
        edge(2, &[(1.0, 0.0), (2.0, 0.0)]),
        edge(3, &[(0.0, 0.0), (0.0, 1.0), (-1.0, 1.0), (0.0, 0.0)]),
    ]);
    let out = ChainMerger::new(&PlanarGeometry)
        .merge(g, &mut PassControl::default())
        .unwrap();

    assert!(out.graph.contains(3));
    for chain in &out.chains {
        assert!(!chain.members.contains(&3));
    }
}

#[test]
fn test_noded_t_junction_is_not_merged() {
    // unnoded T-junction
    let g = graph(vec![
        edge(1, &[(0.0, 0.0), (10.0, 0.0)]),
        edge(2, &[(4.0, 0.0), (4.0, 3.0)]),
    ]);
    let broken = EdgeBreaker::new(&PlanarGeometry)
        .break_graph(g, &mut PassControl::default())
        .unwrap();
    assert_eq!(broken.graph.len(), 3);
    assert_eq!(broken.graph.degree(&crate::graph::VertexKey::new(4.0, 0.0)), 3);

    let dedup = DuplicateResolver::new(&PlanarGeometry)
        .resolve(broken.graph, &mut PassControl::default());
    let merged = ChainMerger::new(&PlanarGeometry)
        .merge(dedup.graph, &mut PassControl::default())
        .unwrap();
    // still a junction: nothing to contract
    assert!(merged.chains.is_empty());
    assert_eq!(merged.graph.len(), 3);
}
