//! Partition a composite mesh into single-material sub-meshes
//!
//! Faces are bucketed by material in first-encounter order. Each bucket gets
//! its own compact vertex table holding only what its faces reference, in
//! the order the faces first reference it. No hashing decides an order, so
//! unchanged input always produces the same sub-meshes.

use hashbrown::HashMap;

use super::types::{Face, FaceVertex, MaterialId, ObjMesh, SubMesh, VertexTable};

/// Faces sharing one material, by index into [`ObjMesh::faces`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub material: Option<MaterialId>,
    pub faces: Vec<usize>,
}

/// Bucket faces by material, preserving first-encounter order
pub fn group_faces(mesh: &ObjMesh) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut slot_of: HashMap<Option<MaterialId>, usize> = HashMap::new();

    for (face_index, face) in mesh.faces.iter().enumerate() {
        let slot = *slot_of.entry(face.material).or_insert_with(|| {
            groups.push(Group {
                material: face.material,
                faces: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].faces.push(face_index);
    }

    groups
}

/// Split a mesh into one self-indexed sub-mesh per material group
pub fn partition(mesh: &ObjMesh) -> Vec<SubMesh> {
    group_faces(mesh)
        .iter()
        .map(|group| build_submesh(mesh, group))
        .collect()
}

/// Old-index to new-index mapping for one attribute table
struct Remap {
    new_index: Vec<Option<usize>>,
    order: Vec<usize>,
}

impl Remap {
    fn new(table_len: usize) -> Self {
        Self {
            new_index: vec![None; table_len],
            order: Vec::new(),
        }
    }

    fn map(&mut self, old: usize) -> usize {
        match self.new_index[old] {
            Some(new) => new,
            None => {
                let new = self.order.len();
                self.new_index[old] = Some(new);
                self.order.push(old);
                new
            }
        }
    }

    fn gather<T: Copy>(&self, table: &[T]) -> Vec<T> {
        self.order.iter().map(|&old| table[old]).collect()
    }
}

fn build_submesh(mesh: &ObjMesh, group: &Group) -> SubMesh {
    let table = &mesh.vertices;
    let mut positions = Remap::new(table.positions.len());
    let mut texcoords = Remap::new(table.texcoords.len());
    let mut normals = Remap::new(table.normals.len());

    let faces: Vec<Face> = group
        .faces
        .iter()
        .map(|&face_index| {
            let vertices = mesh.faces[face_index]
                .vertices
                .iter()
                .map(|v| FaceVertex {
                    position: positions.map(v.position),
                    texcoord: v.texcoord.map(|t| texcoords.map(t)),
                    normal: v.normal.map(|n| normals.map(n)),
                })
                .collect();
            Face {
                vertices,
                material: None,
            }
        })
        .collect();

    SubMesh {
        material: group.material.map(|id| mesh.material_name(id).to_string()),
        vertices: VertexTable {
            positions: positions.gather(&table.positions),
            texcoords: texcoords.gather(&table.texcoords),
            normals: normals.gather(&table.normals),
        },
        faces,
    }
}
