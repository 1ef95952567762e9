//! Small OBJ/MTL/texture fixtures written on demand

use image::{ImageBuffer, Rgb};
use std::io;
use std::path::Path;

/// Three red triangles sharing vertices and one blue quad
pub fn generate_two_material_obj(dir: &Path, stem: &str) -> io::Result<()> {
    std::fs::write(
        dir.join("colors.mtl"),
        "\
newmtl red
Kd 1 0 0
Ks 0.2 0.2 0.2
Ns 500
newmtl blue
Kd 0 0 1
d 0.25
",
    )?;
    std::fs::write(
        dir.join(format!("{stem}.obj")),
        "\
mtllib colors.mtl
o parts
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 2 0 0
v 2 1 0
vn 0 0 1
usemtl red
f 1//1 2//1 3//1
f 1//1 3//1 4//1
f 2//1 5//1 6//1
usemtl blue
f 1 2 5 6
",
    )
}

/// A single triangle whose material is missing from the library
pub fn generate_unresolved_material_obj(dir: &Path, stem: &str) -> io::Result<()> {
    std::fs::write(dir.join("empty.mtl"), "newmtl unused\nKd 0 1 0\n")?;
    std::fs::write(
        dir.join(format!("{stem}.obj")),
        "mtllib empty.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl ghost\nf 1 2 3\n",
    )
}

/// A textured quad whose diffuse map is a JPEG
pub fn generate_textured_obj(dir: &Path, stem: &str) -> io::Result<()> {
    let textures = dir.join("textures");
    std::fs::create_dir_all(&textures)?;
    let img = ImageBuffer::from_fn(8, 8, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([255u8, 255, 255])
        } else {
            Rgb([30u8, 30, 30])
        }
    });
    img.save(textures.join("checker.jpg"))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    std::fs::write(
        dir.join("board.mtl"),
        "newmtl board\nKd 1 1 1\nmap_Kd textures/checker.jpg\n",
    )?;
    std::fs::write(
        dir.join(format!("{stem}.obj")),
        "\
mtllib board.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl board
f 1/1 2/2 3/3 4/4
",
    )
}

/// A mesh whose vertex record holds a non-number
pub fn generate_malformed_obj(dir: &Path, stem: &str) -> io::Result<()> {
    std::fs::write(
        dir.join(format!("{stem}.obj")),
        "v 0 0 0\nv 1 zero 0\nv 0 1 0\nf 1 2 3\n",
    )
}
