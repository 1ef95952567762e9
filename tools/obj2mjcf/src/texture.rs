//! Texture staging into the output directory
//!
//! Textures are copied flat next to the generated meshes. The simulator only
//! loads PNG, so JPEG sources are re-encoded. An optional resize shrinks (or
//! grows) the staged copy, never the source.

use anyhow::{Context, Result};
use hashbrown::HashMap;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

use crate::material::Material;
use crate::warnings::{Warning, Warnings};

/// Copies each distinct source texture into one work directory at most once
pub struct TextureStager<'a> {
    work_dir: &'a Path,
    resize_percent: f32,
    /// Source path -> staged file name
    staged: HashMap<PathBuf, PathBuf>,
}

impl<'a> TextureStager<'a> {
    pub fn new(work_dir: &'a Path, resize_percent: f32) -> Self {
        Self {
            work_dir,
            resize_percent,
            staged: HashMap::new(),
        }
    }

    /// Stage a material's texture and point the material at the staged copy
    ///
    /// On failure the material is left untextured and a warning recorded.
    pub fn stage(&mut self, material: &mut Material, warnings: &mut Warnings) {
        let Some(source) = material.texture.take() else {
            return;
        };

        if let Some(name) = self.staged.get(&source) {
            material.texture = Some(name.clone());
            return;
        }

        let name = self.unique_name(&source);
        match stage_texture(&source, &self.work_dir.join(&name), self.resize_percent) {
            Ok(()) => {
                self.staged.insert(source, name.clone());
                material.texture = Some(name);
            }
            Err(e) => warnings.push(Warning::TextureStagingFailed {
                path: source,
                reason: format!("{:#}", e),
            }),
        }
    }

    /// Staged file names (relative to the work directory), sorted
    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.staged.values().cloned().collect();
        files.sort();
        files
    }

    /// Flat file name for a source, with `.png` for JPEG and a suffix on clashes
    fn unique_name(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "texture".to_string());
        let ext = if is_jpeg(source) {
            "png".to_string()
        } else {
            source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "png".to_string())
        };

        // Compared case-insensitively
        let taken = |candidate: &PathBuf| {
            let candidate = candidate.to_string_lossy().to_lowercase();
            self.staged
                .values()
                .any(|n| n.to_string_lossy().to_lowercase() == candidate)
        };
        let mut candidate = PathBuf::from(format!("{}.{}", stem, ext));
        let mut n = 1;
        while taken(&candidate) {
            candidate = PathBuf::from(format!("{}_{}.{}", stem, n, ext));
            n += 1;
        }
        candidate
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Copy (or convert) one texture to `dest`, resizing if requested
pub fn stage_texture(source: &Path, dest: &Path, resize_percent: f32) -> Result<()> {
    let needs_decode = is_jpeg(source) || resize_percent != 1.0;

    if !needs_decode {
        std::fs::copy(source, dest)
            .with_context(|| format!("Failed to copy texture {:?} to {:?}", source, dest))?;
        return Ok(());
    }

    let img = image::open(source)
        .with_context(|| format!("Failed to load texture: {}", source.display()))?;

    let img = if resize_percent != 1.0 {
        let width = ((img.width() as f32 * resize_percent) as u32).max(1);
        let height = ((img.height() as f32 * resize_percent) as u32).max(1);
        tracing::info!("Resizing {:?} to {}x{}", dest, width, height);
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    img.save(dest)
        .with_context(|| format!("Failed to write texture: {}", dest.display()))?;
    Ok(())
}
