//! V-HACD parameters

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How V-HACD fills the voxelized interior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    #[default]
    Flood,
    Surface,
    Raycast,
}

impl FillMode {
    pub fn as_arg(self) -> &'static str {
        match self {
            FillMode::Flood => "flood",
            FillMode::Surface => "surface",
            FillMode::Raycast => "raycast",
        }
    }
}

/// Invalid decomposition configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Tunable parameters of the external decomposition
///
/// Loaded from TOML with every field optional:
///
/// ```toml
/// enable = true
/// max_output_convex_hulls = 16
/// fill_mode = "surface"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecompositionConfig {
    /// Run the decomposition at all
    pub enable: bool,
    /// Maximum number of output convex hulls (`-h`)
    pub max_output_convex_hulls: u32,
    /// Total number of voxels to use (`-r`)
    pub voxel_resolution: u32,
    /// Volume error allowed, as a percentage (`-e`)
    pub volume_error_percent: f32,
    /// Maximum recursion depth (`-d`)
    pub max_recursion_depth: u32,
    /// Shrink wrap output hulls to the source mesh (`-s`)
    pub shrink_wrap: bool,
    /// Interior fill mode (`-f`)
    pub fill_mode: FillMode,
    /// Maximum number of vertices per output hull (`-v`)
    pub max_hull_vert_count: u32,
    /// Let V-HACD run asynchronously (`-a`)
    pub run_async: bool,
    /// Minimum size of a voxel edge (`-l`)
    pub min_edge_length: u32,
    /// Search for an optimal split plane location (`-p`)
    pub split_hull: bool,
    /// Decompose the whole source mesh once instead of each sub-mesh
    pub whole_mesh: bool,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            enable: false,
            max_output_convex_hulls: 32,
            voxel_resolution: 100_000,
            volume_error_percent: 1.0,
            max_recursion_depth: 14,
            shrink_wrap: true,
            fill_mode: FillMode::Flood,
            max_hull_vert_count: 64,
            run_async: true,
            min_edge_length: 2,
            split_hull: false,
            whole_mesh: false,
        }
    }
}

impl DecompositionConfig {
    /// Load from a TOML file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check every parameter against the range V-HACD accepts
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            ok: bool,
            field: &'static str,
            value: impl ToString,
            expected: &'static str,
        ) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                    expected,
                })
            }
        }

        check(
            self.max_output_convex_hulls >= 1,
            "max_output_convex_hulls",
            self.max_output_convex_hulls,
            ">= 1",
        )?;
        check(
            (10_000..=64_000_000).contains(&self.voxel_resolution),
            "voxel_resolution",
            self.voxel_resolution,
            "10000..=64000000",
        )?;
        check(
            self.volume_error_percent > 0.0 && self.volume_error_percent <= 100.0,
            "volume_error_percent",
            self.volume_error_percent,
            "(0, 100]",
        )?;
        check(
            (1..=64).contains(&self.max_recursion_depth),
            "max_recursion_depth",
            self.max_recursion_depth,
            "1..=64",
        )?;
        check(
            self.max_hull_vert_count >= 4,
            "max_hull_vert_count",
            self.max_hull_vert_count,
            ">= 4",
        )?;
        check(
            (1..=32).contains(&self.min_edge_length),
            "min_edge_length",
            self.min_edge_length,
            "1..=32",
        )?;
        Ok(())
    }

    /// Command line flags for `TestVHACD`, after the input file name
    pub fn to_args(&self) -> Vec<String> {
        let flag = |b: bool| String::from(if b { "1" } else { "0" });
        vec![
            "-o".into(),
            "obj".into(),
            "-h".into(),
            self.max_output_convex_hulls.to_string(),
            "-r".into(),
            self.voxel_resolution.to_string(),
            "-e".into(),
            self.volume_error_percent.to_string(),
            "-d".into(),
            self.max_recursion_depth.to_string(),
            "-s".into(),
            flag(self.shrink_wrap),
            "-f".into(),
            self.fill_mode.as_arg().into(),
            "-v".into(),
            self.max_hull_vert_count.to_string(),
            "-a".into(),
            flag(self.run_async),
            "-l".into(),
            self.min_edge_length.to_string(),
            "-p".into(),
            flag(self.split_hull),
        ]
    }
}
