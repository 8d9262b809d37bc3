use crate::attributes::AttrValue;
use crate::breaker::BreakageReport;
use crate::chain_merge::MergedChain;
use crate::error::CleanError;
use crate::graph::{Edge, EdgeId};
use serde::Serialize;

/// An edge named in a report: its id plus the value of the caller's label
/// attribute, when that attribute is configured and present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flagged {
    pub id: EdgeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<AttrValue>,
}

impl Flagged {
    pub fn from_edge(edge: &Edge, label_field: Option<&str>) -> Self {
        Self {
            id: edge.id,
            label: label_field.and_then(|field| edge.attributes.get(field).cloned()),
        }
    }
}

/// Everything the cleaner found, alongside the cleaned features.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub breakages: Vec<BreakageReport>,
    pub duplicates: Vec<Flagged>,
    pub overlaps: Vec<Flagged>,
    pub orphans: Vec<Flagged>,
    pub merged_chains: Vec<MergedChain>,
    /// Exact parallel duplicates dropped during chain merging.
    pub dropped_parallel_duplicates: Vec<EdgeId>,
    pub issues: Vec<CleanError>,
    /// False when a pass was cancelled before finishing.
    pub complete: bool,
}
