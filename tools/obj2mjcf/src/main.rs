//! obj2mjcf - convert OBJ meshes into MJCF-ready assets
//!
//! Every `*.obj` in a directory becomes a sibling directory holding one OBJ
//! per material, optional convex collision hulls, staged textures and
//! (optionally) an example MJCF document.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use regex::Regex;
use std::path::PathBuf;

use obj2mjcf::collision::FillMode;
use obj2mjcf::{
    convert_all, discover_meshes, ConvertOptions, Converter, ConvexDecomposer,
    DecompositionConfig, ModelValidator, VhacdProcess,
};

#[derive(Parser)]
#[command(name = "obj2mjcf")]
#[command(about = "Convert OBJ meshes into MJCF-ready assets")]
#[command(version)]
struct Cli {
    /// Directory containing the OBJ files to convert
    #[arg(long)]
    obj_dir: PathBuf,

    /// Only convert files whose name matches this regular expression
    #[arg(long)]
    obj_filter: Option<String>,

    /// Write a material library next to the sub-meshes
    #[arg(long)]
    save_mtl: bool,

    /// Write an example MJCF document
    #[arg(long)]
    save_mjcf: bool,

    /// Compile the document with the simulator to check it
    #[arg(long)]
    compile_model: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Scale factor applied to staged textures (1.0 keeps the size)
    #[arg(long, default_value_t = 1.0, value_parser = parse_resize_percent)]
    texture_resize_percent: f32,

    /// Replace existing output directories
    #[arg(long)]
    overwrite: bool,

    /// Add a free joint to the body
    #[arg(long)]
    add_free_joint: bool,

    #[command(flatten)]
    decomposition: DecompositionArgs,
}

/// Convex decomposition overrides, applied on top of `--vhacd-config`
#[derive(Args, Debug, Default)]
struct DecompositionArgs {
    /// TOML file with decomposition parameters
    #[arg(long)]
    vhacd_config: Option<PathBuf>,

    /// Run V-HACD on each sub-mesh
    #[arg(long)]
    vhacd_enable: bool,

    /// Maximum number of output convex hulls
    #[arg(long)]
    vhacd_max_output_convex_hulls: Option<u32>,

    /// Total number of voxels to use
    #[arg(long)]
    vhacd_voxel_resolution: Option<u32>,

    /// Volume error allowed, as a percentage
    #[arg(long)]
    vhacd_volume_error_percent: Option<f32>,

    /// Maximum recursion depth
    #[arg(long)]
    vhacd_max_recursion_depth: Option<u32>,

    /// Don't shrink wrap output hulls to the source mesh
    #[arg(long)]
    vhacd_disable_shrink_wrap: bool,

    /// Interior fill mode
    #[arg(long, value_enum)]
    vhacd_fill_mode: Option<FillMode>,

    /// Maximum number of vertices per output hull
    #[arg(long)]
    vhacd_max_hull_vert_count: Option<u32>,

    /// Run V-HACD synchronously
    #[arg(long)]
    vhacd_disable_async: bool,

    /// Minimum size of a voxel edge
    #[arg(long)]
    vhacd_min_edge_length: Option<u32>,

    /// Search for an optimal split plane location
    #[arg(long)]
    vhacd_split_hull: bool,

    /// Decompose the whole source mesh once instead of each sub-mesh
    #[arg(long)]
    decompose_whole_mesh: bool,
}

impl DecompositionArgs {
    /// Load the config file (if any) and apply command line overrides
    fn resolve(&self) -> Result<DecompositionConfig> {
        let mut config = match &self.vhacd_config {
            Some(path) => DecompositionConfig::load(path)?,
            None => DecompositionConfig::default(),
        };

        if self.vhacd_enable {
            config.enable = true;
        }
        if let Some(v) = self.vhacd_max_output_convex_hulls {
            config.max_output_convex_hulls = v;
        }
        if let Some(v) = self.vhacd_voxel_resolution {
            config.voxel_resolution = v;
        }
        if let Some(v) = self.vhacd_volume_error_percent {
            config.volume_error_percent = v;
        }
        if let Some(v) = self.vhacd_max_recursion_depth {
            config.max_recursion_depth = v;
        }
        if self.vhacd_disable_shrink_wrap {
            config.shrink_wrap = false;
        }
        if let Some(v) = self.vhacd_fill_mode {
            config.fill_mode = v;
        }
        if let Some(v) = self.vhacd_max_hull_vert_count {
            config.max_hull_vert_count = v;
        }
        if self.vhacd_disable_async {
            config.run_async = false;
        }
        if let Some(v) = self.vhacd_min_edge_length {
            config.min_edge_length = v;
        }
        if self.vhacd_split_hull {
            config.split_hull = true;
        }
        if self.decompose_whole_mesh {
            config.whole_mesh = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_resize_percent(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{} must be greater than 0", value))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let decomposition = cli
        .decomposition
        .resolve()
        .context("Invalid decomposition settings")?;

    let filter = cli
        .obj_filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid --obj-filter pattern")?;

    let meshes = discover_meshes(&cli.obj_dir, filter.as_ref())?;
    if meshes.is_empty() {
        tracing::warn!("No OBJ files found in {}", cli.obj_dir.display());
        return Ok(());
    }
    tracing::info!("Found {} OBJ files", meshes.len());

    let options = ConvertOptions {
        save_mtl: cli.save_mtl,
        save_mjcf: cli.save_mjcf,
        compile_model: cli.compile_model,
        texture_resize_percent: cli.texture_resize_percent,
        overwrite: cli.overwrite,
        add_free_joint: cli.add_free_joint,
        decompose_whole_mesh: decomposition.whole_mesh,
    };

    let vhacd = VhacdProcess::locate(&decomposition);
    let validator = if cli.compile_model {
        ModelValidator::locate()
    } else {
        None
    };

    let converter = Converter::new(&options)
        .with_decomposer(vhacd.as_ref().map(|v| v as &dyn ConvexDecomposer))
        .with_validator(validator.as_ref());

    let summary = convert_all(&converter, &meshes);
    tracing::info!(
        "Converted {} of {} meshes ({} warnings)",
        summary.reports.len(),
        meshes.len(),
        summary.warning_count()
    );

    if !summary.is_success() {
        bail!(
            "{} of {} meshes failed to convert",
            summary.failures.len(),
            meshes.len()
        );
    }
    Ok(())
}
