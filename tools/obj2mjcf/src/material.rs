//! Material library (MTL) parsing and resolution
//!
//! Only the properties the simulator can use are kept: ambient, diffuse and
//! specular colors, dissolve/transparency, shininess and the diffuse texture.
//! Nothing here is fatal. Broken lines are skipped with a warning and names
//! that cannot be resolved fall back to an opaque white material.

use hashbrown::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::warnings::{Warning, Warnings};

/// Name used for faces declared before any `usemtl`
pub const DEFAULT_MATERIAL_NAME: &str = "default";

/// Shininess and specular used when the MTL doesn't say
const DEFAULT_SPECULAR: f32 = 0.5;
const DEFAULT_SHININESS: f32 = 0.5;

/// MTL `Ns` values normally range from 0 to 1000
const NS_RANGE: f32 = 1000.0;

/// Visual properties of one named material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// `Ka`
    pub ambient: Option<[f32; 3]>,
    /// `Kd`, white when absent
    pub diffuse: [f32; 3],
    /// `Ks`
    pub specular: Option<[f32; 3]>,
    /// From `d`, else `1 - Tr`, else 1
    pub opacity: f32,
    /// Raw `Ns`
    pub shininess: Option<f32>,
    /// `map_Kd`, resolved against the library's directory
    pub texture: Option<PathBuf>,
}

impl Material {
    /// White, opaque, untextured
    pub fn default_named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ambient: None,
            diffuse: [1.0, 1.0, 1.0],
            specular: None,
            opacity: 1.0,
            shininess: None,
            texture: None,
        }
    }

    pub fn rgba(&self) -> [f32; 4] {
        let [r, g, b] = self.diffuse;
        [r, g, b, self.opacity]
    }

    /// Mean of the `Ks` channels
    pub fn specular_intensity(&self) -> f32 {
        self.specular
            .map(|[r, g, b]| (r + g + b) / 3.0)
            .unwrap_or(DEFAULT_SPECULAR)
    }

    /// `Ns` normalized to [0, 1]
    pub fn shininess_normalized(&self) -> f32 {
        self.shininess
            .map(|ns| (ns / NS_RANGE).clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_SHININESS)
    }

    /// Write this material as an MTL `newmtl` block
    pub fn write_mtl<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "newmtl {}", self.name)?;
        if let Some([r, g, b]) = self.ambient {
            writeln!(w, "Ka {} {} {}", r, g, b)?;
        }
        let [r, g, b] = self.diffuse;
        writeln!(w, "Kd {} {} {}", r, g, b)?;
        if let Some([r, g, b]) = self.specular {
            writeln!(w, "Ks {} {} {}", r, g, b)?;
        }
        if let Some(ns) = self.shininess {
            writeln!(w, "Ns {}", ns)?;
        }
        writeln!(w, "d {}", self.opacity)?;
        if let Some(texture) = &self.texture {
            writeln!(w, "map_Kd {}", texture.display())?;
        }
        Ok(())
    }
}

/// Material under construction, before dissolve/transparency are folded
#[derive(Debug)]
struct PendingMaterial {
    material: Material,
    dissolve: Option<f32>,
    transparency: Option<f32>,
}

impl PendingMaterial {
    fn new(name: &str) -> Self {
        Self {
            material: Material::default_named(name),
            dissolve: None,
            transparency: None,
        }
    }

    fn finish(mut self) -> Material {
        let opacity = match (self.dissolve, self.transparency) {
            (Some(d), _) => d,
            (None, Some(tr)) => 1.0 - tr,
            (None, None) => 1.0,
        };
        self.material.opacity = opacity.clamp(0.0, 1.0);
        self.material
    }
}

/// Parse MTL text into materials, in declaration order
///
/// `base_dir` is the directory texture paths are relative to and
/// `source_name` only labels warnings.
pub fn parse_mtl(
    content: &str,
    base_dir: &Path,
    source_name: &str,
    warnings: &mut Warnings,
) -> Vec<Material> {
    let mut materials = Vec::new();
    let mut current: Option<PendingMaterial> = None;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = |warnings: &mut Warnings| {
            warnings.push(Warning::MalformedProperty {
                source_name: source_name.to_string(),
                line: i + 1,
                text: line.to_string(),
            })
        };

        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((k, v)) => (k, v.trim()),
            None => (line, ""),
        };

        if key == "newmtl" {
            if value.is_empty() {
                malformed(warnings);
                continue;
            }
            if let Some(done) = current.take() {
                materials.push(done.finish());
            }
            current = Some(PendingMaterial::new(value));
            continue;
        }

        let Some(pending) = current.as_mut() else {
            malformed(warnings);
            continue;
        };

        let applied = match key {
            "Ka" => parse_color(value).map(|c| pending.material.ambient = Some(c)),
            "Kd" => parse_color(value).map(|c| pending.material.diffuse = c),
            "Ks" => parse_color(value).map(|c| pending.material.specular = Some(c)),
            "d" => value.parse::<f32>().ok().map(|d| pending.dissolve = Some(d)),
            "Tr" => value.parse::<f32>().ok().map(|tr| pending.transparency = Some(tr)),
            "Ns" => value.parse::<f32>().ok().map(|ns| pending.material.shininess = Some(ns)),
            "map_Kd" => texture_file(value).map(|file| {
                pending.material.texture = Some(base_dir.join(file));
            }),
            _ => {
                if value.is_empty() {
                    None
                } else {
                    tracing::debug!("{}:{}: ignoring MTL property '{}'", source_name, i + 1, key);
                    Some(())
                }
            }
        };

        if applied.is_none() {
            malformed(warnings);
        }
    }

    if let Some(done) = current.take() {
        materials.push(done.finish());
    }

    materials
}

/// Parse `r g b`, or a single value applied to all channels
fn parse_color(value: &str) -> Option<[f32; 3]> {
    let channels: Vec<f32> = value
        .split_whitespace()
        .map(|s| s.parse().ok())
        .collect::<Option<_>>()?;
    match channels.as_slice() {
        [v] => Some([*v, *v, *v]),
        [r, g, b] => Some([*r, *g, *b]),
        _ => None,
    }
}

/// Texture file from a `map_Kd` value, skipping `-option args` prefixes
fn texture_file(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        return None;
    }
    let file = if value.starts_with('-') {
        value.split_whitespace().last()?
    } else {
        value
    };
    // Exporters on Windows write backslashes
    Some(PathBuf::from(file.replace('\\', "/")))
}

/// Materials from every library an OBJ references, keyed by name
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every library, relative to `obj_dir`
    ///
    /// Missing or unreadable libraries and missing textures are warnings.
    pub fn load(paths: &[PathBuf], obj_dir: &Path, warnings: &mut Warnings) -> Self {
        let mut library = Self::new();

        for relative in paths {
            let path = obj_dir.join(relative);
            if !path.is_file() {
                warnings.push(Warning::MissingMaterialLibrary(path));
                continue;
            }
            let content = match std::fs::read(&path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warnings.push(Warning::UnreadableMaterialLibrary {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            tracing::info!("Found MTL file: {:?}", path);

            let base_dir = path.parent().unwrap_or(obj_dir);
            let source_name = relative.display().to_string();
            for mut material in parse_mtl(&content, base_dir, &source_name, warnings) {
                if let Some(texture) = &material.texture {
                    if !texture.is_file() {
                        warnings.push(Warning::MissingTexture {
                            material: material.name.clone(),
                            path: texture.clone(),
                        });
                        material.texture = None;
                    }
                }
                library.insert(material, warnings);
            }
        }

        library
    }

    /// Add a material; a later definition replaces an earlier one
    pub fn insert(&mut self, material: Material, warnings: &mut Warnings) {
        tracing::info!("Found material: {}", material.name);
        if self.materials.contains_key(&material.name) {
            warnings.push(Warning::RedefinedMaterial(material.name.clone()));
        }
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Resolve the material of a face group
    ///
    /// `None` (no `usemtl`) resolves to [`DEFAULT_MATERIAL_NAME`]. Unknown
    /// names resolve to a white default carrying the requested name.
    pub fn resolve(&self, name: Option<&str>, warnings: &mut Warnings) -> Material {
        let name = name.unwrap_or(DEFAULT_MATERIAL_NAME);
        match self.get(name) {
            Some(material) => material.clone(),
            None => {
                // Faces without usemtl are expected to be plain white
                if name != DEFAULT_MATERIAL_NAME {
                    warnings.push(Warning::UnresolvedMaterial(name.to_string()));
                }
                Material::default_named(name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LIBRARY: &str = "\
# exported
newmtl red
Ka 0.1 0.1 0.1
Kd 1 0 0
Ks 0.3 0.6 0.9
Ns 250
illum 2

newmtl glass
Kd 0.8 0.9 1.0
Tr 0.75

newmtl wood
d 0.5
Tr 0.1
map_Kd textures\\wood.png
";

    fn parse(content: &str) -> (Vec<Material>, Warnings) {
        let mut warnings = Warnings::new();
        let materials = parse_mtl(content, Path::new("/assets"), "test.mtl", &mut warnings);
        (materials, warnings)
    }

    #[test]
    fn test_parse_materials_in_order() {
        let (materials, warnings) = parse(LIBRARY);
        let names: Vec<&str> = materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["red", "glass", "wood"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_derived_scene_values() {
        let (materials, _) = parse(LIBRARY);
        let red = &materials[0];
        assert_eq!(red.rgba(), [1.0, 0.0, 0.0, 1.0]);
        assert!((red.specular_intensity() - 0.6).abs() < 1e-6);
        assert!((red.shininess_normalized() - 0.25).abs() < 1e-6);
        assert_eq!(red.ambient, Some([0.1, 0.1, 0.1]));
    }

    #[test]
    fn test_opacity_prefers_dissolve_over_transparency() {
        let (materials, _) = parse(LIBRARY);
        assert!((materials[1].opacity - 0.25).abs() < 1e-6);
        assert_eq!(materials[2].opacity, 0.5);
    }

    #[test]
    fn test_defaults_when_properties_missing() {
        let (materials, _) = parse("newmtl plain\n");
        let plain = &materials[0];
        assert_eq!(plain.rgba(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(plain.specular_intensity(), DEFAULT_SPECULAR);
        assert_eq!(plain.shininess_normalized(), DEFAULT_SHININESS);
        assert_eq!(plain.texture, None);
    }

    #[test]
    fn test_texture_resolved_against_library_dir() {
        let (materials, _) = parse(LIBRARY);
        assert_eq!(
            materials[2].texture,
            Some(PathBuf::from("/assets/textures/wood.png"))
        );

        let (materials, _) = parse("newmtl a\nmap_Kd -s 2 2 1 tex.png\n");
        assert_eq!(materials[0].texture, Some(PathBuf::from("/assets/tex.png")));
    }

    #[test]
    fn test_malformed_lines_warn_and_are_skipped() {
        let (materials, warnings) = parse("Kd 1 1 1\nnewmtl a\nKd 1 x 1\nd\nNs 10\n");
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].diffuse, [1.0, 1.0, 1.0]);
        assert_eq!(materials[0].shininess, Some(10.0));

        let lines: Vec<usize> = warnings
            .iter()
            .map(|w| match w {
                Warning::MalformedProperty { line, .. } => *line,
                other => panic!("unexpected warning: {other}"),
            })
            .collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn test_resolve_unknown_name_falls_back_to_white() {
        let mut warnings = Warnings::new();
        let library = MaterialLibrary::new();

        let material = library.resolve(Some("missing"), &mut warnings);
        assert_eq!(material.name, "missing");
        assert_eq!(material.rgba(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(material.texture, None);
        assert_eq!(
            warnings.iter().next(),
            Some(&Warning::UnresolvedMaterial("missing".to_string()))
        );
    }

    #[test]
    fn test_resolve_no_material_is_silent_default() {
        let mut warnings = Warnings::new();
        let material = MaterialLibrary::new().resolve(None, &mut warnings);
        assert_eq!(material.name, DEFAULT_MATERIAL_NAME);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_load_libraries_from_disk() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("a.mtl"), "newmtl a\nKd 0 1 0\nmap_Kd gone.png\n").unwrap();
        std::fs::write(dir.path().join("b.mtl"), "newmtl a\nKd 0 0 1\n").unwrap();

        let mut warnings = Warnings::new();
        let paths = [
            PathBuf::from("a.mtl"),
            PathBuf::from("b.mtl"),
            PathBuf::from("c.mtl"),
        ];
        let library = MaterialLibrary::load(&paths, dir.path(), &mut warnings);

        assert_eq!(library.len(), 1);
        assert_eq!(library.get("a").unwrap().diffuse, [0.0, 0.0, 1.0]);

        let warnings = warnings.into_vec();
        assert!(matches!(warnings[0], Warning::MissingTexture { .. }));
        assert_eq!(warnings[1], Warning::RedefinedMaterial("a".to_string()));
        assert!(matches!(warnings[2], Warning::MissingMaterialLibrary(_)));
    }

    #[test]
    fn test_write_mtl_block() {
        let (materials, _) = parse("newmtl red\nKd 1 0 0\nNs 100\nd 0.5\n");
        let mut out = Vec::new();
        materials[0].write_mtl(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "newmtl red\nKd 1 0 0\nNs 100\nd 0.5\n"
        );
    }
}
