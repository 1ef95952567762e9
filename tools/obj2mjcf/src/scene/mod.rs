//! MJCF scene document emitter
//!
//! The document is assembled from visual parts and collision geometry in the
//! order they are added, so unchanged input always yields the same text.
//! Every asset that names a file is recorded, which lets the pipeline check
//! the document against what it actually wrote.

mod naming;
pub mod xml;

pub use naming::{sanitize_name, submesh_names, NameRegistry};
pub use xml::Element;

use anyhow::{Context, Result};
use hashbrown::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::material::Material;

const VISUAL_CLASS: &str = "visual";
const COLLISION_CLASS: &str = "collision";

/// Geom groups the simulator viewer toggles independently
const VISUAL_GROUP: &str = "2";
const COLLISION_GROUP: &str = "3";

/// Incrementally collects assets and geoms for one body
#[derive(Debug)]
pub struct SceneBuilder {
    model: String,
    free_joint: bool,
    textures: Vec<Element>,
    materials: Vec<Element>,
    meshes: Vec<Element>,
    visual_geoms: Vec<Element>,
    collision_geoms: Vec<Element>,
    /// Texture file -> texture asset name
    texture_names: HashMap<PathBuf, String>,
    texture_registry: NameRegistry,
    declared_materials: HashSet<String>,
    declared_meshes: HashSet<String>,
}

impl SceneBuilder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            free_joint: false,
            textures: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            visual_geoms: Vec::new(),
            collision_geoms: Vec::new(),
            texture_names: HashMap::new(),
            texture_registry: NameRegistry::new(),
            declared_materials: HashSet::new(),
            declared_meshes: HashSet::new(),
        }
    }

    /// Give the body a free joint so it can move in the simulation
    pub fn free_joint(mut self, enabled: bool) -> Self {
        self.free_joint = enabled;
        self
    }

    /// Add a visual sub-mesh with its resolved material
    ///
    /// `file` is relative to the document. A material (and its texture) is
    /// declared the first time its name is seen.
    pub fn add_visual(&mut self, mesh: &str, file: &Path, material: &Material) {
        self.declare_mesh(mesh, file);
        self.declare_material(material);
        self.visual_geoms.push(
            Element::new("geom")
                .attr("mesh", mesh)
                .attr("material", material.name.as_str())
                .attr("class", VISUAL_CLASS),
        );
    }

    /// Add a convex hull with its own mesh file
    pub fn add_collision_mesh(&mut self, mesh: &str, file: &Path) {
        self.declare_mesh(mesh, file);
        self.add_collision_proxy(mesh);
    }

    /// Add a collision geom for an already declared mesh
    pub fn add_collision_proxy(&mut self, mesh: &str) {
        self.collision_geoms.push(
            Element::new("geom")
                .attr("mesh", mesh)
                .attr("class", COLLISION_CLASS),
        );
    }

    fn declare_mesh(&mut self, mesh: &str, file: &Path) {
        if self.declared_meshes.insert(mesh.to_string()) {
            self.meshes.push(
                Element::new("mesh")
                    .attr("name", mesh)
                    .attr("file", file_attr(file)),
            );
        }
    }

    fn declare_material(&mut self, material: &Material) {
        if !self.declared_materials.insert(material.name.clone()) {
            return;
        }

        let mut element = Element::new("material").attr("name", material.name.as_str());
        match &material.texture {
            Some(file) => {
                let texture = self.declare_texture(file);
                element = element.attr("texture", texture);
            }
            None => {
                element = element.attr("rgba", format_floats(&material.rgba()));
            }
        }
        element = element
            .attr("specular", format_floats(&[material.specular_intensity()]))
            .attr("shininess", format_floats(&[material.shininess_normalized()]));
        self.materials.push(element);
    }

    fn declare_texture(&mut self, file: &Path) -> String {
        if let Some(name) = self.texture_names.get(file) {
            return name.clone();
        }
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = self.texture_registry.claim(&sanitize_name(&stem));
        self.textures.push(
            Element::new("texture")
                .attr("type", "2d")
                .attr("name", name.as_str())
                .attr("file", file_attr(file)),
        );
        self.texture_names.insert(file.to_path_buf(), name.clone());
        name
    }

    pub fn build(self) -> SceneDocument {
        let defaults = Element::new("default")
            .child(
                Element::new("default").attr("class", VISUAL_CLASS).child(
                    Element::new("geom")
                        .attr("group", VISUAL_GROUP)
                        .attr("type", "mesh")
                        .attr("contype", "0")
                        .attr("conaffinity", "0"),
                ),
            )
            .child(
                Element::new("default").attr("class", COLLISION_CLASS).child(
                    Element::new("geom")
                        .attr("group", COLLISION_GROUP)
                        .attr("type", "mesh"),
                ),
            );

        let mut asset = Element::new("asset");
        asset.children.extend(self.textures);
        asset.children.extend(self.materials);
        asset.children.extend(self.meshes);

        let mut body = Element::new("body").attr("name", self.model.as_str());
        if self.free_joint {
            body.push(Element::new("freejoint"));
        }
        body.children.extend(self.visual_geoms);
        body.children.extend(self.collision_geoms);

        let root = Element::new("mujoco")
            .attr("model", self.model.as_str())
            .child(defaults)
            .child(asset)
            .child(Element::new("worldbody").child(body));

        SceneDocument { root }
    }
}

/// A finished scene document
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    root: Element,
}

impl SceneDocument {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn to_xml_string(&self) -> String {
        self.root.to_document_string()
    }

    /// Every file the assets refer to, relative to the document, sorted
    pub fn referenced_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .root
            .find("asset")
            .into_iter()
            .flat_map(|asset| asset.children.iter())
            .filter_map(|element| element.get("file"))
            .map(PathBuf::from)
            .collect();
        files.sort();
        files.dedup();
        files
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml_string())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Relative paths always use `/` in the document
fn file_attr(file: &Path) -> String {
    file.to_string_lossy().replace('\\', "/")
}

fn format_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
