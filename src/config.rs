//! Engine configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a GrainDB engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base directory holding one subdirectory per database.
    pub base_dir: PathBuf,
}

impl EngineConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("databases"),
        }
    }
}
