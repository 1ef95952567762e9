//! Directory discovery and parallel conversion of many meshes

use anyhow::{anyhow, bail, Result};
use hashbrown::HashMap;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::pipeline::{work_dir_for, Converter, MeshReport};

/// OBJ files directly inside `dir`, sorted by file name
///
/// With a `filter`, only files whose name matches it somewhere are kept.
pub fn discover_meshes(dir: &Path, filter: Option<&Regex>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut meshes = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("obj"))
            .unwrap_or(false);
        if !is_obj {
            continue;
        }
        if let Some(filter) = filter {
            let name = entry.file_name().to_string_lossy();
            if !filter.is_match(&name) {
                tracing::info!("Skipping {} (filtered)", name);
                continue;
            }
        }
        meshes.push(path.to_path_buf());
    }
    Ok(meshes)
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<MeshReport>,
    pub failures: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Convert every mesh in parallel; one failure never stops the others
///
/// Meshes whose stems only differ in case (or extension case) would share
/// an output directory. The first one in order is converted and the rest
/// fail without touching the directory.
pub fn convert_all(converter: &Converter<'_>, meshes: &[PathBuf]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut claimed: HashMap<String, &PathBuf> = HashMap::new();
    let mut jobs: Vec<&PathBuf> = Vec::with_capacity(meshes.len());
    let mut conflicts = Vec::new();

    for path in meshes {
        let Some(work_dir) = work_dir_for(path) else {
            jobs.push(path);
            continue;
        };
        let key = work_dir.to_string_lossy().to_lowercase();
        match claimed.get(&key) {
            Some(first) => conflicts.push((
                path.clone(),
                anyhow!(
                    "{} shares its output directory {} with {}",
                    path.display(),
                    work_dir.display(),
                    first.display()
                ),
            )),
            None => {
                claimed.insert(key, path);
                jobs.push(path);
            }
        }
    }

    let results: Vec<(PathBuf, Result<MeshReport>)> = jobs
        .par_iter()
        .map(|path| ((*path).clone(), converter.convert(path)))
        .collect();

    for (path, result) in results.into_iter().chain(
        conflicts
            .into_iter()
            .map(|(path, e)| (path, Err(e))),
    ) {
        match result {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                tracing::error!("{}: {:#}", path.display(), e);
                summary.failures.push((path, e));
            }
        }
    }
    summary
}
