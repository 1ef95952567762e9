//! V-HACD (`TestVHACD`) subprocess

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{ConvexDecomposer, ConvexHull, DecompositionConfig, DecompositionError};
use crate::mesh::load_obj;
use crate::warnings::Warnings;

/// Executable looked up on `PATH`
pub const VHACD_EXECUTABLE: &str = "TestVHACD";

/// Name the input is copied to inside the scratch directory
const INPUT_NAME: &str = "source.obj";

/// Combined outputs V-HACD writes next to the per-hull files
const COMBINED_OUTPUTS: [&str; 2] = ["decomp.obj", "decomp.stl"];

/// Runs `TestVHACD` once per input file in a scratch directory
#[derive(Debug, Clone)]
pub struct VhacdProcess {
    program: PathBuf,
    args: Vec<String>,
}

impl VhacdProcess {
    pub fn new(program: PathBuf, config: &DecompositionConfig) -> Self {
        Self {
            program,
            args: config.to_args(),
        }
    }

    /// Find `TestVHACD` on `PATH` when decomposition is enabled
    pub fn locate(config: &DecompositionConfig) -> Option<Self> {
        if !config.enable {
            return None;
        }
        match which::which(VHACD_EXECUTABLE) {
            Ok(program) => {
                tracing::info!("Using V-HACD at {:?}", program);
                Some(Self::new(program, config))
            }
            Err(_) => {
                tracing::warn!(
                    "V-HACD was enabled but {} was not found on PATH, \
                     sub-meshes will be used as their own collision geometry",
                    VHACD_EXECUTABLE
                );
                None
            }
        }
    }
}

impl ConvexDecomposer for VhacdProcess {
    fn decompose(&self, obj_file: &Path) -> Result<Vec<ConvexHull>, DecompositionError> {
        let scratch = tempfile::tempdir().map_err(DecompositionError::Scratch)?;
        std::fs::copy(obj_file, scratch.path().join(INPUT_NAME))
            .map_err(DecompositionError::Scratch)?;

        // Suppress V-HACD's progress chatter
        let status = Command::new(&self.program)
            .arg(INPUT_NAME)
            .args(&self.args)
            .current_dir(scratch.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| DecompositionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(DecompositionError::ExitStatus {
                program: self.program.clone(),
                status,
            });
        }

        let hull_files = collect_hull_files(scratch.path()).map_err(DecompositionError::Scratch)?;
        if hull_files.is_empty() {
            return Err(DecompositionError::NoHulls);
        }

        hull_files.into_iter().map(|path| read_hull(&path)).collect()
    }
}

/// Per-hull OBJ files in a scratch directory, sorted by name
fn collect_hull_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_obj = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("obj"))
            .unwrap_or(false);
        if is_obj && name != INPUT_NAME && !COMBINED_OUTPUTS.contains(&name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_hull(path: &Path) -> Result<ConvexHull, DecompositionError> {
    // Hull files carry no materials; skipped faces only make the hull coarser
    let mut warnings = Warnings::new();
    let mesh = load_obj(path, &mut warnings).map_err(|source| DecompositionError::MalformedOutput {
        path: path.to_path_buf(),
        source,
    })?;
    if mesh.faces.is_empty() {
        return Err(DecompositionError::NoHulls);
    }
    Ok(ConvexHull {
        vertices: mesh.vertices,
        faces: mesh.faces,
    })
}
