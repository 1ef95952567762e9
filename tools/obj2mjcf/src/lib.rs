//! obj2mjcf library
//!
//! Splits multi-material OBJ meshes into single-material sub-meshes, attaches
//! collision geometry and describes the result as an MJCF scene document.

pub mod batch;
pub mod collision;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod texture;
pub mod validate;
pub mod warnings;

// Re-export key types for conversion
pub use batch::{convert_all, discover_meshes, BatchSummary};
pub use collision::{ConvexDecomposer, DecompositionConfig, VhacdProcess};
pub use pipeline::{ConvertOptions, Converter, MeshReport};
pub use scene::SceneDocument;
pub use validate::ModelValidator;
pub use warnings::{Warning, Warnings};
