//! Wavefront OBJ parsing
//!
//! Parsing is line oriented. Each line is classified into an [`ObjRecord`];
//! directives we don't care about (groups, smoothing, lines, points...) are
//! classified as [`ObjRecord::Ignored`]. Broken numbers in geometry records
//! are fatal because the geometry can no longer be trusted.

use std::fmt;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use super::types::{Face, FaceVertex, MaterialId, ObjMesh, VertexTable};
use crate::warnings::{Warning, Warnings};

/// Which attribute table a face index points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Position,
    TexCoord,
    Normal,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Position => f.write_str("position"),
            AttributeKind::TexCoord => f.write_str("texture coordinate"),
            AttributeKind::Normal => f.write_str("normal"),
        }
    }
}

/// Fatal OBJ parse failure
#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: invalid number '{text}' in '{keyword}' record")]
    InvalidNumber {
        line: usize,
        keyword: &'static str,
        text: String,
    },

    #[error("line {line}: '{keyword}' record needs at least {expected} values, found {found}")]
    MissingValues {
        line: usize,
        keyword: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: invalid face vertex '{text}'")]
    InvalidIndex { line: usize, text: String },

    #[error("line {line}: {kind} index {index} is out of range ({len} declared)")]
    IndexOutOfRange {
        line: usize,
        kind: AttributeKind,
        index: i64,
        len: usize,
    },
}

/// A face corner as written in the file: 1-based, or negative for relative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawFaceVertex {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

/// One classified line
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ObjRecord<'a> {
    Position([f32; 3]),
    TexCoord([f32; 2]),
    Normal([f32; 3]),
    Face(Vec<RawFaceVertex>),
    MaterialLibrary(&'a str),
    UseMaterial(&'a str),
    Ignored,
}

/// Load and parse an OBJ file from disk
pub fn load_obj(path: &Path, warnings: &mut Warnings) -> Result<ObjMesh, ObjError> {
    let bytes = std::fs::read(path).map_err(|source| ObjError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // Comments in the wild are not always UTF-8
    let content = String::from_utf8_lossy(&bytes);
    parse_obj(&content, warnings)
}

/// Parse OBJ text into attribute tables and material-tagged faces
pub fn parse_obj(content: &str, warnings: &mut Warnings) -> Result<ObjMesh, ObjError> {
    let mut mesh = ObjMesh::default();
    let mut material_ids: HashMap<String, MaterialId> = HashMap::new();
    let mut current_material: Option<MaterialId> = None;

    // Positive indices may point forward, so bounds are checked after the last line
    let mut face_lines: Vec<usize> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        match classify_line(line, line_no)? {
            ObjRecord::Position(p) => mesh.vertices.positions.push(p),
            ObjRecord::TexCoord(t) => mesh.vertices.texcoords.push(t),
            ObjRecord::Normal(n) => mesh.vertices.normals.push(n),
            ObjRecord::Face(raw) => {
                if raw.len() < 3 {
                    warnings.push(Warning::DegenerateFace {
                        line: line_no,
                        count: raw.len(),
                    });
                    continue;
                }
                let vertices = raw
                    .iter()
                    .map(|v| resolve_relative(v, &mesh.vertices, line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                mesh.faces.push(Face {
                    vertices,
                    material: current_material,
                });
                face_lines.push(line_no);
            }
            ObjRecord::MaterialLibrary(name) => {
                mesh.material_libraries.push(PathBuf::from(name));
            }
            ObjRecord::UseMaterial(name) => {
                let next_id = MaterialId(mesh.material_names.len() as u32);
                let id = *material_ids.entry(name.to_string()).or_insert_with(|| {
                    mesh.material_names.push(name.to_string());
                    next_id
                });
                current_material = Some(id);
            }
            ObjRecord::Ignored => {}
        }
    }

    for (face, &line) in mesh.faces.iter().zip(&face_lines) {
        check_bounds(face, &mesh.vertices, line)?;
    }

    tracing::debug!(
        "Parsed OBJ: {} positions, {} texcoords, {} normals, {} faces, {} materials",
        mesh.vertices.positions.len(),
        mesh.vertices.texcoords.len(),
        mesh.vertices.normals.len(),
        mesh.faces.len(),
        mesh.material_names.len()
    );

    Ok(mesh)
}

/// Classify a single line of OBJ text
pub(crate) fn classify_line(line: &str, line_no: usize) -> Result<ObjRecord<'_>, ObjError> {
    let line = strip_comment(line).trim();
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (line, ""),
    };

    let record = match keyword {
        "v" => {
            let [x, y, z] = parse_floats::<3>(rest, "v", line_no)?;
            ObjRecord::Position([x, y, z])
        }
        "vt" => {
            // `vt u [v [w]]`: v defaults to 0, w is dropped
            let values = parse_float_list(rest, "vt", line_no)?;
            match values.as_slice() {
                [] => {
                    return Err(ObjError::MissingValues {
                        line: line_no,
                        keyword: "vt",
                        expected: 1,
                        found: 0,
                    })
                }
                [u] => ObjRecord::TexCoord([*u, 0.0]),
                [u, v, ..] => ObjRecord::TexCoord([*u, *v]),
            }
        }
        "vn" => {
            let [x, y, z] = parse_floats::<3>(rest, "vn", line_no)?;
            ObjRecord::Normal([x, y, z])
        }
        "f" => {
            let vertices = rest
                .split_whitespace()
                .map(|token| parse_face_vertex(token, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            ObjRecord::Face(vertices)
        }
        "mtllib" => match parse_mtllib(rest) {
            Some(name) => ObjRecord::MaterialLibrary(name),
            None => ObjRecord::Ignored,
        },
        "usemtl" if !rest.is_empty() => ObjRecord::UseMaterial(rest),
        _ => ObjRecord::Ignored,
    };

    Ok(record)
}

/// Extract a material library name from the text following `mtllib`
///
/// The name may contain spaces but must end in `.mtl`.
pub fn parse_mtllib(rest: &str) -> Option<&str> {
    let name = strip_comment(rest).trim();
    if name.len() > ".mtl".len() && name.ends_with(".mtl") {
        Some(name)
    } else {
        None
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_float_list(rest: &str, keyword: &'static str, line_no: usize) -> Result<Vec<f32>, ObjError> {
    rest.split_whitespace()
        .map(|token| {
            token.parse::<f32>().map_err(|_| ObjError::InvalidNumber {
                line: line_no,
                keyword,
                text: token.to_string(),
            })
        })
        .collect()
}

/// Parse the first `N` floats of a record, ignoring any extras (`v x y z w`, vertex colors)
fn parse_floats<const N: usize>(
    rest: &str,
    keyword: &'static str,
    line_no: usize,
) -> Result<[f32; N], ObjError> {
    let values = parse_float_list(rest, keyword, line_no)?;
    if values.len() < N {
        return Err(ObjError::MissingValues {
            line: line_no,
            keyword,
            expected: N,
            found: values.len(),
        });
    }
    let mut out = [0.0f32; N];
    out.copy_from_slice(&values[..N]);
    Ok(out)
}

/// Parse a face vertex: "v", "v/vt", "v/vt/vn", or "v//vn"
fn parse_face_vertex(token: &str, line_no: usize) -> Result<RawFaceVertex, ObjError> {
    let invalid = || ObjError::InvalidIndex {
        line: line_no,
        text: token.to_string(),
    };
    let parse_index = |s: &str| -> Result<i64, ObjError> {
        match s.parse::<i64>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(i) => Ok(i),
        }
    };
    let optional = |s: Option<&str>| -> Result<Option<i64>, ObjError> {
        match s {
            None | Some("") => Ok(None),
            Some(s) => parse_index(s).map(Some),
        }
    };

    let mut parts = token.split('/');
    let position = parse_index(parts.next().unwrap_or_default())?;
    let texcoord = optional(parts.next())?;
    let normal = optional(parts.next())?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(RawFaceVertex {
        position,
        texcoord,
        normal,
    })
}

/// Convert 1-based / negative-relative indices to 0-based ones
fn resolve_relative(
    raw: &RawFaceVertex,
    table: &VertexTable,
    line_no: usize,
) -> Result<FaceVertex, ObjError> {
    let resolve = |index: i64, len: usize, kind: AttributeKind| -> Result<usize, ObjError> {
        if index > 0 {
            return Ok((index - 1) as usize);
        }
        // Negative indices count back from the most recent declaration
        let resolved = len as i64 + index;
        if resolved < 0 {
            return Err(ObjError::IndexOutOfRange {
                line: line_no,
                kind,
                index,
                len,
            });
        }
        Ok(resolved as usize)
    };

    Ok(FaceVertex {
        position: resolve(raw.position, table.positions.len(), AttributeKind::Position)?,
        texcoord: raw
            .texcoord
            .map(|i| resolve(i, table.texcoords.len(), AttributeKind::TexCoord))
            .transpose()?,
        normal: raw
            .normal
            .map(|i| resolve(i, table.normals.len(), AttributeKind::Normal))
            .transpose()?,
    })
}

fn check_bounds(face: &Face, table: &VertexTable, line_no: usize) -> Result<(), ObjError> {
    let check = |index: usize, len: usize, kind: AttributeKind| {
        if index < len {
            Ok(())
        } else {
            Err(ObjError::IndexOutOfRange {
                line: line_no,
                kind,
                index: index as i64 + 1,
                len,
            })
        }
    };

    for v in &face.vertices {
        check(v.position, table.positions.len(), AttributeKind::Position)?;
        if let Some(t) = v.texcoord {
            check(t, table.texcoords.len(), AttributeKind::TexCoord)?;
        }
        if let Some(n) = v.normal {
            check(n, table.normals.len(), AttributeKind::Normal)?;
        }
    }
    Ok(())
}
