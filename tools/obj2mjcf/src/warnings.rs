//! Recoverable conditions collected while converting a mesh
//!
//! Nothing in here stops the pipeline. Each warning is logged when it is
//! recorded and also kept so callers (and tests) can inspect what degraded.

use std::path::PathBuf;

/// A degraded-but-recoverable condition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error("material '{0}' is not defined in any material library, using default white")]
    UnresolvedMaterial(String),

    #[error("material library {} not found", .0.display())]
    MissingMaterialLibrary(PathBuf),

    #[error("material library {} could not be read: {reason}", .path.display())]
    UnreadableMaterialLibrary { path: PathBuf, reason: String },

    #[error("{source_name}:{line}: malformed material property '{text}' skipped")]
    MalformedProperty {
        source_name: String,
        line: usize,
        text: String,
    },

    #[error("material '{0}' is defined more than once, the last definition wins")]
    RedefinedMaterial(String),

    #[error("texture {} for material '{material}' not found, material left untextured", .path.display())]
    MissingTexture { material: String, path: PathBuf },

    #[error("texture {} could not be staged: {reason}", .path.display())]
    TextureStagingFailed { path: PathBuf, reason: String },

    #[error("line {line}: face with {count} vertices skipped")]
    DegenerateFace { line: usize, count: usize },

    #[error("convex decomposition of '{unit}' failed, using source geometry: {reason}")]
    DecompositionFallback { unit: String, reason: String },

    #[error("model validation skipped: {0}")]
    ValidationSkipped(String),

    #[error("model validation failed: {0}")]
    ValidationFailed(String),
}

/// Ordered collection of warnings for one mesh
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    /// Append warnings recorded elsewhere (already logged)
    pub fn append(&mut self, other: Warnings) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
