//! Error kinds produced while cleaning a network.
//!
//! Only graph insertion faults are ever returned as an `Err`: an id collision
//! ([`CleanError::InconsistentId`]) or an edge with fewer than two vertices. Everything
//! else is collected into a pass's issue list and the pipeline carries on.

use crate::graph::EdgeId;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleanError {
    #[error("feature {id} has unsupported geometry type '{geometry_type}'")]
    MalformedGeometry { id: EdgeId, geometry_type: String },
    #[error("chain starting at edge {start} revisits edge {repeated}, left unmerged")]
    UnboundedChain { start: EdgeId, repeated: EdgeId },
    #[error("{pass} pass cancelled before completion")]
    CancellationRequested { pass: &'static str },
    #[error("edge id {id} is already in use")]
    InconsistentId { id: EdgeId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedGeometry,
    UnboundedChain,
    CancellationRequested,
    InconsistentId,
}

impl CleanError {
    pub fn kind(&self) -> IssueKind {
        match self {
            CleanError::MalformedGeometry { .. } => IssueKind::MalformedGeometry,
            CleanError::UnboundedChain { .. } => IssueKind::UnboundedChain,
            CleanError::CancellationRequested { .. } => IssueKind::CancellationRequested,
            CleanError::InconsistentId { .. } => IssueKind::InconsistentId,
        }
    }

    /// The offending edge or feature id, if the error is tied to one.
    pub fn edge_id(&self) -> Option<EdgeId> {
        match self {
            CleanError::MalformedGeometry { id, .. } => Some(*id),
            CleanError::UnboundedChain { start, .. } => Some(*start),
            CleanError::CancellationRequested { .. } => None,
            CleanError::InconsistentId { id } => Some(*id),
        }
    }
}
