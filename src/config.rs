use crate::geometry::ExtractOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Attribute used to label edges in reports.
    pub label_field: Option<String>,
    /// Attribute stamped with an edge's previous id (or its break label) by edge breaking.
    pub alias_field: String,
    /// Decimal places coordinates are rounded to during edge extraction.
    pub tolerance: Option<u32>,
    pub simplify: bool,
    pub break_at_intersections: bool,
    pub remove_duplicates: bool,
    pub report_orphans: bool,
    pub merge_chains: bool,
    pub merge_attributes: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            label_field: None,
            alias_field: "broken_id".to_string(),
            tolerance: None,
            simplify: true,
            break_at_intersections: true,
            remove_duplicates: true,
            report_orphans: false,
            merge_chains: true,
            merge_attributes: true,
        }
    }
}

impl CleanerConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new(self.tolerance, self.simplify)
    }
}
