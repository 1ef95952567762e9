//! OBJ text output for sub-meshes and convex hulls

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::types::{Face, VertexTable};

/// Optional material directives written ahead of the geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjHeader<'a> {
    /// `mtllib` file name, relative to the written OBJ
    pub material_library: Option<&'a str>,
    /// `usemtl` name
    pub material: Option<&'a str>,
}

/// Write vertex tables and faces as OBJ text (1-based indices)
pub fn write_obj<W: Write>(
    w: &mut W,
    vertices: &VertexTable,
    faces: &[Face],
    header: ObjHeader<'_>,
) -> io::Result<()> {
    if let Some(library) = header.material_library {
        writeln!(w, "mtllib {}", library)?;
    }

    for [x, y, z] in &vertices.positions {
        writeln!(w, "v {} {} {}", x, y, z)?;
    }
    for [u, v] in &vertices.texcoords {
        writeln!(w, "vt {} {}", u, v)?;
    }
    for [x, y, z] in &vertices.normals {
        writeln!(w, "vn {} {} {}", x, y, z)?;
    }

    if let Some(material) = header.material {
        writeln!(w, "usemtl {}", material)?;
    }

    for face in faces {
        w.write_all(b"f")?;
        for v in &face.vertices {
            let p = v.position + 1;
            match (v.texcoord, v.normal) {
                (Some(t), Some(n)) => write!(w, " {}/{}/{}", p, t + 1, n + 1)?,
                (Some(t), None) => write!(w, " {}/{}", p, t + 1)?,
                (None, Some(n)) => write!(w, " {}//{}", p, n + 1)?,
                (None, None) => write!(w, " {}", p)?,
            }
        }
        w.write_all(b"\n")?;
    }

    Ok(())
}

/// Write an OBJ file to disk
pub fn save_obj(
    path: &Path,
    vertices: &VertexTable,
    faces: &[Face],
    header: ObjHeader<'_>,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write_obj(&mut writer, vertices, faces, header)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write OBJ: {:?}", path))?;
    Ok(())
}
