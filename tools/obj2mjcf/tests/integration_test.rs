//! Integration tests for obj2mjcf
//!
//! Tests the full pipeline: generate test assets -> convert -> verify output

mod generate_test_assets;

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::tempdir;

/// Two materials become two sub-meshes with their own files
#[test]
fn test_two_materials_two_submeshes() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_two_material_obj(dir.path(), "panel")
        .expect("Failed to generate OBJ");

    let output = run_obj2mjcf(dir.path(), &["--save-mjcf", "--save-mtl"]);
    assert_success(&output);

    let work_dir = dir.path().join("panel");
    let red = read(&work_dir.join("panel_red.obj"));
    let blue = read(&work_dir.join("panel_blue.obj"));

    assert_eq!(count_lines(&red, "f "), 3);
    assert_eq!(count_lines(&red, "v "), 6);
    assert_eq!(count_lines(&red, "vn "), 1);
    assert!(red.starts_with("mtllib panel.mtl\n"));
    assert_eq!(count_lines(&blue, "f "), 1);
    assert!(blue.contains("f 1 2 3 4\n"));

    let mtl = read(&work_dir.join("panel.mtl"));
    assert_eq!(count_lines(&mtl, "newmtl "), 2);

    let xml = read(&work_dir.join("panel.xml"));
    assert!(xml.contains(r#"<mujoco model="panel">"#));
    assert!(xml.contains(r#"<material name="blue" rgba="0 0 1 0.25""#));
    assert_eq!(xml.matches(r#"class="visual"/>"#).count(), 2);
}

/// A material missing from the library is a warning, not a failure
#[test]
fn test_unresolved_material_falls_back_to_white() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_unresolved_material_obj(dir.path(), "ghost")
        .expect("Failed to generate OBJ");

    let output = run_obj2mjcf(dir.path(), &["--save-mjcf"]);
    assert_success(&output);
    assert!(
        combined(&output).contains("'ghost' is not defined"),
        "expected an unresolved material warning"
    );

    let xml = read(&dir.path().join("ghost").join("ghost.xml"));
    assert!(xml.contains(r#"<material name="ghost" rgba="1 1 1 1""#));
}

/// Without decomposition each sub-mesh is its own collision geom
#[test]
fn test_collision_proxies_reuse_visual_meshes() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_two_material_obj(dir.path(), "panel")
        .expect("Failed to generate OBJ");

    assert_success(&run_obj2mjcf(dir.path(), &["--save-mjcf"]));

    let xml = read(&dir.path().join("panel").join("panel.xml"));
    for mesh in ["panel_red", "panel_blue"] {
        assert!(xml.contains(&format!(r#"<geom mesh="{mesh}" class="collision"/>"#)));
    }
    assert_eq!(xml.matches("<mesh ").count(), 2);
    assert!(!xml.contains("_collision_"));
}

/// Every file the document names was written, and nothing else was
#[test]
fn test_asset_references_match_written_files() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_textured_obj(dir.path(), "board")
        .expect("Failed to generate OBJ");

    assert_success(&run_obj2mjcf(dir.path(), &["--save-mjcf"]));

    let work_dir = dir.path().join("board");
    let xml = read(&work_dir.join("board.xml"));
    let file_attr = Regex::new(r#"file="([^"]+)""#).unwrap();
    let mut referenced: Vec<String> = file_attr
        .captures_iter(&xml)
        .map(|c| c[1].to_string())
        .collect();
    referenced.sort();
    referenced.dedup();

    let written: Vec<String> = snapshot(&work_dir)
        .into_keys()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|name| name != "board.xml")
        .collect();

    assert_eq!(referenced, written);
    assert!(written.contains(&"checker.png".to_string()));
    assert!(xml.contains(r#"<texture type="2d" name="checker" file="checker.png"/>"#));
    assert!(xml.contains(r#"texture="checker""#));
}

/// Re-running on unchanged input produces byte-identical output
#[test]
fn test_repeated_runs_are_identical() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_two_material_obj(dir.path(), "panel")
        .expect("Failed to generate OBJ");
    generate_test_assets::generate_textured_obj(dir.path(), "board")
        .expect("Failed to generate OBJ");

    let args = ["--save-mjcf", "--save-mtl", "--overwrite", "--add-free-joint"];
    assert_success(&run_obj2mjcf(dir.path(), &args));
    let first = (snapshot(&dir.path().join("panel")), snapshot(&dir.path().join("board")));

    assert_success(&run_obj2mjcf(dir.path(), &args));
    let second = (snapshot(&dir.path().join("panel")), snapshot(&dir.path().join("board")));

    assert_eq!(first, second);
}

/// An existing output directory is left alone without --overwrite
#[test]
fn test_existing_output_requires_overwrite() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_two_material_obj(dir.path(), "panel")
        .expect("Failed to generate OBJ");

    assert_success(&run_obj2mjcf(dir.path(), &[]));
    let output = run_obj2mjcf(dir.path(), &[]);
    assert!(!output.status.success(), "second run should refuse to overwrite");
    assert!(combined(&output).contains("--overwrite"));

    assert_success(&run_obj2mjcf(dir.path(), &["--overwrite"]));
}

/// A malformed mesh fails the run but the others are still converted
#[test]
fn test_malformed_mesh_sets_exit_status() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_malformed_obj(dir.path(), "broken")
        .expect("Failed to generate OBJ");
    generate_test_assets::generate_two_material_obj(dir.path(), "panel")
        .expect("Failed to generate OBJ");

    let output = run_obj2mjcf(dir.path(), &[]);
    assert!(!output.status.success());
    assert!(!dir.path().join("broken").exists());
    assert!(dir.path().join("panel").join("panel_red.obj").is_file());
}

/// Only files matching --obj-filter are converted
#[test]
fn test_obj_filter() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_two_material_obj(dir.path(), "keep_me")
        .expect("Failed to generate OBJ");
    generate_test_assets::generate_malformed_obj(dir.path(), "skip_me")
        .expect("Failed to generate OBJ");

    let output = run_obj2mjcf(dir.path(), &["--obj-filter", "^keep"]);
    assert_success(&output);
    assert!(dir.path().join("keep_me").is_dir());
    assert!(!dir.path().join("skip_me").exists());
}

/// Texture resizing applies to the staged copy only
#[test]
fn test_texture_resize() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_textured_obj(dir.path(), "board")
        .expect("Failed to generate OBJ");

    assert_success(&run_obj2mjcf(dir.path(), &["--texture-resize-percent", "0.5"]));

    let staged = image::open(dir.path().join("board").join("checker.png"))
        .expect("Failed to open staged texture");
    assert_eq!((staged.width(), staged.height()), (4, 4));
    let source = image::open(dir.path().join("textures").join("checker.jpg"))
        .expect("Failed to open source texture");
    assert_eq!((source.width(), source.height()), (8, 8));
}

// Helper to run obj2mjcf on a directory
fn run_obj2mjcf(obj_dir: &Path, extra: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_obj2mjcf"))
        .arg("--obj-dir")
        .arg(obj_dir)
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run obj2mjcf")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "obj2mjcf failed:\n{}",
        combined(output)
    );
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {:?}: {}", path, e))
}

fn count_lines(text: &str, prefix: &str) -> usize {
    text.lines().filter(|l| l.starts_with(prefix)).count()
}

/// File name -> contents for every file in a directory
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    std::fs::read_dir(dir)
        .expect("Failed to list output directory")
        .map(|entry| {
            let path = entry.expect("Failed to read entry").path();
            let name = PathBuf::from(path.file_name().unwrap());
            let data = std::fs::read(&path).expect("Failed to read output file");
            (name, data)
        })
        .collect()
}
