//! Conversion of one OBJ file into a directory of simulator assets

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::collision::{
    generate_collisions, CollisionOwner, CollisionPiece, CollisionSet, ConvexDecomposer,
    DecompositionUnit,
};
use crate::material::{Material, MaterialLibrary};
use crate::mesh::{load_obj, partition, save_obj, ObjHeader, SubMesh};
use crate::scene::{sanitize_name, submesh_names, NameRegistry, SceneBuilder, SceneDocument};
use crate::texture::TextureStager;
use crate::validate::{validate_model, ModelValidator};
use crate::warnings::Warnings;

/// Output toggles shared by every mesh of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Write `<stem>.mtl` and reference it from the sub-mesh files
    pub save_mtl: bool,
    /// Write `<stem>.xml`
    pub save_mjcf: bool,
    /// Check the document with the simulator's compiler
    pub compile_model: bool,
    /// Scale factor applied to staged textures
    pub texture_resize_percent: f32,
    /// Replace an existing work directory
    pub overwrite: bool,
    /// Give the body a free joint
    pub add_free_joint: bool,
    /// Decompose the whole source mesh instead of each sub-mesh
    pub decompose_whole_mesh: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            save_mtl: false,
            save_mjcf: false,
            compile_model: false,
            texture_resize_percent: 1.0,
            overwrite: false,
            add_free_joint: false,
            decompose_whole_mesh: false,
        }
    }
}

/// Result of converting one mesh
#[derive(Debug)]
pub struct MeshReport {
    pub source: PathBuf,
    pub work_dir: PathBuf,
    /// Generated mesh names, in group order
    pub submeshes: Vec<String>,
    /// Number of collision geoms in the document
    pub collision_geoms: usize,
    /// Every file written, relative to `work_dir`, sorted
    pub written_files: Vec<PathBuf>,
    pub document: SceneDocument,
    pub warnings: Warnings,
}

/// Converts OBJ files with a fixed set of options and collaborators
pub struct Converter<'a> {
    pub options: &'a ConvertOptions,
    pub decomposer: Option<&'a dyn ConvexDecomposer>,
    pub validator: Option<&'a ModelValidator>,
}

impl<'a> Converter<'a> {
    pub fn new(options: &'a ConvertOptions) -> Self {
        Self {
            options,
            decomposer: None,
            validator: None,
        }
    }

    pub fn with_decomposer(mut self, decomposer: Option<&'a dyn ConvexDecomposer>) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn with_validator(mut self, validator: Option<&'a ModelValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Convert `<dir>/<stem>.obj` into `<dir>/<stem>/`
    pub fn convert(&self, obj_path: &Path) -> Result<MeshReport> {
        tracing::info!("Processing {}", obj_path.display());

        let stem = obj_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("No file name in {}", obj_path.display()))?;
        let obj_dir = obj_path.parent().unwrap_or_else(|| Path::new("."));
        let work_dir = obj_dir.join(&stem);
        let model = sanitize_name(&stem);

        let mut warnings = Warnings::new();
        let mesh = load_obj(obj_path, &mut warnings)
            .with_context(|| format!("Failed to parse {}", obj_path.display()))?;

        prepare_work_dir(&work_dir, self.options.overwrite)?;

        let library = MaterialLibrary::load(&mesh.material_libraries, obj_dir, &mut warnings);
        let submeshes = partition(&mesh);
        tracing::info!("{} split into {} sub-meshes", stem, submeshes.len());

        let mut stager = TextureStager::new(&work_dir, self.options.texture_resize_percent);
        let materials: Vec<Material> = submeshes
            .iter()
            .map(|submesh| {
                let mut material = library.resolve(submesh.material.as_deref(), &mut warnings);
                stager.stage(&mut material, &mut warnings);
                material
            })
            .collect();

        let mut registry = NameRegistry::new();
        let group_materials: Vec<Option<&str>> =
            submeshes.iter().map(|s| s.material.as_deref()).collect();
        let names = submesh_names(&stem, &group_materials, &mut registry);

        let mut written: Vec<PathBuf> = stager.staged_files();
        let mtl_name = format!("{}.mtl", stem);

        let mut units = Vec::with_capacity(submeshes.len());
        for ((submesh, material), name) in submeshes.iter().zip(&materials).zip(&names) {
            let file = PathBuf::from(format!("{}.obj", name));
            write_submesh(
                &work_dir.join(&file),
                submesh,
                material,
                self.options.save_mtl.then_some(mtl_name.as_str()),
            )?;
            units.push(DecompositionUnit {
                name: name.clone(),
                obj_file: work_dir.join(&file),
            });
            written.push(file);
        }

        let whole_mesh = (self.decomposer.is_some() && self.options.decompose_whole_mesh).then(|| {
            DecompositionUnit {
                name: model.clone(),
                obj_file: obj_path.to_path_buf(),
            }
        });
        let collisions =
            generate_collisions(self.decomposer, &units, whole_mesh.as_ref(), &mut warnings);

        let mut builder = SceneBuilder::new(&model).free_joint(self.options.add_free_joint);
        for ((name, unit), material) in names.iter().zip(&units).zip(&materials) {
            let file = relative_to(&unit.obj_file, &work_dir);
            builder.add_visual(name, &file, material);
        }
        let collision_geoms = add_collisions(
            &mut builder,
            &collisions,
            &names,
            &model,
            &work_dir,
            &mut registry,
            &mut written,
        )?;

        if self.options.save_mtl {
            save_mtl(&work_dir.join(&mtl_name), &materials)?;
            written.push(PathBuf::from(&mtl_name));
        }

        let document = builder.build();
        if self.options.save_mjcf {
            let xml_name = format!("{}.xml", stem);
            document.save(&work_dir.join(&xml_name))?;
            written.push(PathBuf::from(xml_name));
        }

        if self.options.compile_model {
            validate_model(self.validator, &document, &work_dir, &mut warnings);
        }

        written.sort();
        Ok(MeshReport {
            source: obj_path.to_path_buf(),
            work_dir,
            submeshes: names,
            collision_geoms,
            written_files: written,
            document,
            warnings,
        })
    }
}

/// Output directory for `<dir>/<stem>.obj`: `<dir>/<stem>/`
pub fn work_dir_for(obj_path: &Path) -> Option<PathBuf> {
    let stem = obj_path.file_stem()?;
    let obj_dir = obj_path.parent().unwrap_or_else(|| Path::new("."));
    Some(obj_dir.join(stem))
}

/// Create the work directory, refusing to mix with a previous run
fn prepare_work_dir(work_dir: &Path, overwrite: bool) -> Result<()> {
    if work_dir.exists() {
        if !overwrite {
            bail!(
                "Output directory {} already exists, pass --overwrite to replace it",
                work_dir.display()
            );
        }
        tracing::info!("Removing previous output in {}", work_dir.display());
        std::fs::remove_dir_all(work_dir)
            .with_context(|| format!("Failed to remove {}", work_dir.display()))?;
    }
    std::fs::create_dir_all(work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))
}

fn write_submesh(
    path: &Path,
    submesh: &SubMesh,
    material: &Material,
    material_library: Option<&str>,
) -> Result<()> {
    tracing::info!("Saving {}", path.display());
    let header = ObjHeader {
        material_library,
        material: Some(material.name.as_str()),
    };
    save_obj(path, &submesh.vertices, &submesh.faces, header)
}

/// Write hull files and add one collision geom per piece
fn add_collisions(
    builder: &mut SceneBuilder,
    collisions: &[CollisionSet],
    names: &[String],
    model: &str,
    work_dir: &Path,
    registry: &mut NameRegistry,
    written: &mut Vec<PathBuf>,
) -> Result<usize> {
    let mut count = 0;
    for set in collisions {
        let owner_name = match set.owner {
            CollisionOwner::SubMesh(index) => names[index].as_str(),
            CollisionOwner::WholeMesh => model,
        };
        for (j, piece) in set.pieces.iter().enumerate() {
            match piece {
                CollisionPiece::SourceProxy => builder.add_collision_proxy(owner_name),
                CollisionPiece::Hull(hull) => {
                    let name = registry.claim(&format!("{}_collision_{}", owner_name, j));
                    let file = PathBuf::from(format!("{}.obj", name));
                    save_obj(&work_dir.join(&file), &hull.vertices, &hull.faces, ObjHeader::default())?;
                    builder.add_collision_mesh(&name, &file);
                    written.push(file);
                }
            }
            count += 1;
        }
    }
    Ok(count)
}

/// One `newmtl` block per material name, in group order
fn save_mtl(path: &Path, materials: &[Material]) -> Result<()> {
    tracing::info!("Saving {}", path.display());
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let mut seen = Vec::new();
    for material in materials {
        if seen.contains(&material.name.as_str()) {
            continue;
        }
        seen.push(material.name.as_str());
        if seen.len() > 1 {
            writeln!(w)?;
        }
        material.write_mtl(&mut w)?;
    }
    w.flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}
