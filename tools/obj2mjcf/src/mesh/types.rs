//! Types shared by the OBJ parser, the partitioner and the writer

use std::path::PathBuf;

/// Index of a material name in [`ObjMesh::material_names`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// One corner of a face: 0-based indices into the attribute tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// A polygon in declaration (winding) order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub vertices: Vec<FaceVertex>,
    /// Material active when the face was declared, `None` before any `usemtl`
    pub material: Option<MaterialId>,
}

/// Positions, texture coordinates and normals in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexTable {
    pub positions: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

/// A fully parsed OBJ file
#[derive(Debug, Clone, Default)]
pub struct ObjMesh {
    pub vertices: VertexTable,
    pub faces: Vec<Face>,
    /// Distinct `usemtl` names in first-declaration order
    pub material_names: Vec<String>,
    /// `mtllib` references, relative to the OBJ file's directory
    pub material_libraries: Vec<PathBuf>,
}

impl ObjMesh {
    /// Name for a material id produced by this mesh's parser
    pub fn material_name(&self, id: MaterialId) -> &str {
        &self.material_names[id.0 as usize]
    }
}

/// A single-material, self-indexed fragment of an [`ObjMesh`]
#[derive(Debug, Clone, PartialEq)]
pub struct SubMesh {
    /// Material name of the group, `None` for faces without `usemtl`
    pub material: Option<String>,
    pub vertices: VertexTable,
    /// Faces with indices into `vertices`; `Face::material` is always `None`
    pub faces: Vec<Face>,
}

impl SubMesh {
    /// Number of face corners across all faces
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(|f| f.vertices.len()).sum()
    }
}
