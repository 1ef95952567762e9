//! Collision geometry policy
//!
//! Decides what feeds the external convex decomposition and what to do with
//! its output. The decomposition itself is a black box behind
//! [`ConvexDecomposer`]; the only implementation shipped is the V-HACD
//! command line tool in [`vhacd`].

mod config;
pub mod vhacd;

pub use config::{ConfigError, DecompositionConfig, FillMode};
pub use vhacd::VhacdProcess;

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::mesh::{Face, ObjError, VertexTable};
use crate::warnings::{Warning, Warnings};

/// One convex piece produced by the decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    pub vertices: VertexTable,
    pub faces: Vec<Face>,
}

/// Collision geometry attached to the body
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionPiece {
    /// The visual sub-mesh doubles as its own collision geometry
    SourceProxy,
    /// A convex hull that gets its own mesh file
    Hull(ConvexHull),
}

/// What a set of collision pieces approximates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOwner {
    /// Index into the sub-mesh list
    SubMesh(usize),
    /// The whole source mesh
    WholeMesh,
}

/// Ordered collision pieces for one decomposition unit
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionSet {
    pub owner: CollisionOwner,
    pub pieces: Vec<CollisionPiece>,
}

impl CollisionSet {
    fn proxy(index: usize) -> Self {
        Self {
            owner: CollisionOwner::SubMesh(index),
            pieces: vec![CollisionPiece::SourceProxy],
        }
    }
}

/// A geometry file offered to the decomposition
#[derive(Debug, Clone)]
pub struct DecompositionUnit {
    /// Name used in warnings and generated file names
    pub name: String,
    /// OBJ file holding the unit's geometry
    pub obj_file: PathBuf,
}

/// Failure of one external decomposition call
#[derive(Debug, thiserror::Error)]
pub enum DecompositionError {
    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{} exited with {status}", .program.display())]
    ExitStatus {
        program: PathBuf,
        status: std::process::ExitStatus,
    },

    #[error("hull {} could not be parsed: {source}", .path.display())]
    MalformedOutput { path: PathBuf, source: ObjError },

    #[error("no convex hulls were produced")]
    NoHulls,
}

/// Approximates the geometry in an OBJ file with convex hulls
pub trait ConvexDecomposer: Sync {
    fn decompose(&self, obj_file: &Path) -> Result<Vec<ConvexHull>, DecompositionError>;
}

/// Build collision sets for a mesh's sub-meshes
///
/// Without a decomposer every sub-mesh is its own collision proxy. With one,
/// each unit is decomposed (in parallel); a failed unit falls back to proxies
/// and records a warning. When `whole_mesh` is given, the whole source mesh is
/// decomposed once instead of each sub-mesh.
pub fn generate_collisions(
    decomposer: Option<&dyn ConvexDecomposer>,
    submeshes: &[DecompositionUnit],
    whole_mesh: Option<&DecompositionUnit>,
    warnings: &mut Warnings,
) -> Vec<CollisionSet> {
    let Some(decomposer) = decomposer else {
        return (0..submeshes.len()).map(CollisionSet::proxy).collect();
    };

    if let Some(unit) = whole_mesh {
        return match decompose_unit(decomposer, unit) {
            Ok(hulls) => vec![CollisionSet {
                owner: CollisionOwner::WholeMesh,
                pieces: hulls.into_iter().map(CollisionPiece::Hull).collect(),
            }],
            Err(warning) => {
                warnings.push(warning);
                (0..submeshes.len()).map(CollisionSet::proxy).collect()
            }
        };
    }

    let results: Vec<Result<Vec<ConvexHull>, Warning>> = submeshes
        .par_iter()
        .map(|unit| decompose_unit(decomposer, unit))
        .collect();

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(hulls) => CollisionSet {
                owner: CollisionOwner::SubMesh(index),
                pieces: hulls.into_iter().map(CollisionPiece::Hull).collect(),
            },
            Err(warning) => {
                warnings.push(warning);
                CollisionSet::proxy(index)
            }
        })
        .collect()
}

fn decompose_unit(
    decomposer: &dyn ConvexDecomposer,
    unit: &DecompositionUnit,
) -> Result<Vec<ConvexHull>, Warning> {
    tracing::info!("Decomposing {:?}", unit.obj_file);
    let hulls = decomposer
        .decompose(&unit.obj_file)
        .and_then(|hulls| {
            if hulls.is_empty() {
                Err(DecompositionError::NoHulls)
            } else {
                Ok(hulls)
            }
        })
        .map_err(|e| Warning::DecompositionFallback {
            unit: unit.name.clone(),
            reason: e.to_string(),
        })?;
    tracing::info!("{} split into {} convex hulls", unit.name, hulls.len());
    Ok(hulls)
}
