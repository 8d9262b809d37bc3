//! The full cleaning pipeline: build, break at intersections, remove duplicates and
//! overlaps, then contract chains. Each pass after the build can be switched off in
//! [`CleanerConfig`].

use crate::breaker::EdgeBreaker;
use crate::chain_merge::ChainMerger;
use crate::config::CleanerConfig;
use crate::control::PassControl;
use crate::duplicates::DuplicateResolver;
use crate::error::CleanError;
use crate::geometry::GeometryService;
use crate::graph::{Edge, Feature, PlanarGraph};
use crate::report::CleanReport;
use log::{info, warn};

#[derive(Debug)]
pub struct CleanOutput {
    /// Cleaned `(id, attributes, geometry)` edges in graph order.
    pub edges: Vec<Edge>,
    pub report: CleanReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Break,
    Dedupe,
    Merge,
}

pub struct Cleaner<'g, G: GeometryService> {
    config: CleanerConfig,
    geometry: &'g G,
}

impl<'g, G: GeometryService> Cleaner<'g, G> {
    pub fn new(config: CleanerConfig, geometry: &'g G) -> Self {
        Self { config, geometry }
    }

    fn passes(&self) -> Vec<Pass> {
        let mut passes = Vec::with_capacity(3);
        if self.config.break_at_intersections {
            passes.push(Pass::Break);
        }
        if self.config.remove_duplicates {
            passes.push(Pass::Dedupe);
        }
        if self.config.merge_chains {
            passes.push(Pass::Merge);
        }
        passes
    }

    /// Runs every enabled pass in order. A cancelled pass keeps what it finished,
    /// the passes after it are skipped and the report is marked incomplete.
    pub fn run(
        &self,
        features: Vec<Feature>,
        control: &mut PassControl<'_>,
    ) -> Result<CleanOutput, CleanError> {
        let feature_count = features.len();
        let (mut graph, build_issues) =
            PlanarGraph::build(features, self.geometry, self.config.extract_options());

        let mut report = CleanReport {
            issues: build_issues,
            complete: true,
            ..CleanReport::default()
        };

        let passes = self.passes();
        for (index, pass) in passes.iter().enumerate() {
            let mut stage = control.stage(index, passes.len());
            graph = match pass {
                Pass::Break => {
                    let out = EdgeBreaker::new(self.geometry)
                        .extract_options(self.config.extract_options())
                        .alias_field(self.config.alias_field.clone())
                        .label_field(self.config.label_field.clone())
                        .break_graph(graph, &mut stage)?;
                    report.breakages = out.breakages;
                    report.issues.extend(out.issues);
                    report.complete = out.complete;
                    out.graph
                }
                Pass::Dedupe => {
                    let out = DuplicateResolver::new(self.geometry)
                        .report_orphans(self.config.report_orphans)
                        .label_field(self.config.label_field.clone())
                        .resolve(graph, &mut stage);
                    report.duplicates = out.duplicates;
                    report.overlaps = out.overlaps;
                    report.orphans = out.orphans;
                    out.graph
                }
                Pass::Merge => {
                    let out = ChainMerger::new(self.geometry)
                        .merge_attributes(self.config.merge_attributes)
                        .merge(graph, &mut stage)?;
                    report.merged_chains = out.chains;
                    report.dropped_parallel_duplicates = out.dropped_duplicates;
                    report.issues.extend(out.issues);
                    report.complete = out.complete;
                    out.graph
                }
            };

            if !report.complete {
                warn!("Stopping after {:?} pass: cancelled", pass);
                break;
            }
        }

        if report.complete {
            control.report(1.0);
        }

        info!(
            "Cleaned {} features into {} edges ({} issues)",
            feature_count,
            graph.len(),
            report.issues.len()
        );

        Ok(CleanOutput {
            edges: graph.into_edges(),
            report,
        })
    }
}
