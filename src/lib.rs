//! Topology cleaning for road-centreline networks: noding at unresolved
//! intersections, duplicate and overlap removal, and contraction of chains through
//! degree-2 vertices.

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

pub mod attributes;
pub mod breaker;
pub mod chain_merge;
pub mod cleaner;
pub mod config;
pub mod control;
pub mod degree;
pub mod duplicates;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod id_allocator;
pub mod report;
pub mod spatial_index;

#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod test_support;

pub use attributes::{AttrValue, Attributes};
pub use cleaner::{CleanOutput, Cleaner};
pub use config::CleanerConfig;
pub use control::{CancelFlag, PassControl};
pub use error::CleanError;
pub use geometry::{GeometryService, PlanarGeometry};
pub use graph::{Edge, EdgeId, Feature, PlanarGraph};
pub use report::CleanReport;
