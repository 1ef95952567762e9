//! Optional check of the emitted document with the simulator's compiler

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::scene::SceneDocument;
use crate::warnings::{Warning, Warnings};

/// Simulator sample program that loads a model and writes it back out
pub const COMPILE_EXECUTABLE: &str = "compile";

/// Runs the simulator's `compile` program on a scene document
#[derive(Debug, Clone)]
pub struct ModelValidator {
    program: PathBuf,
}

impl ModelValidator {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Find `compile` on `PATH`
    pub fn locate() -> Option<Self> {
        which::which(COMPILE_EXECUTABLE).ok().map(Self::new)
    }

    /// Compile `document` as if it lived in `work_dir`
    ///
    /// The simulator resolves asset paths against the model file's own
    /// directory, so the document is written as a hidden temporary file
    /// directly inside `work_dir`. Temporary files are removed whatever the
    /// outcome.
    pub fn validate(&self, document: &SceneDocument, work_dir: &Path) -> Result<(), String> {
        let mut input = tempfile::Builder::new()
            .prefix(".validate")
            .suffix(".xml")
            .tempfile_in(work_dir)
            .map_err(|e| format!("failed to create temporary model: {}", e))?;
        let output = tempfile::Builder::new()
            .prefix(".validate")
            .suffix(".mjb")
            .tempfile_in(work_dir)
            .map_err(|e| format!("failed to create temporary output: {}", e))?;

        input
            .write_all(document.to_xml_string().as_bytes())
            .and_then(|_| input.flush())
            .map_err(|e| format!("failed to write {}: {}", input.path().display(), e))?;

        let result = Command::new(&self.program)
            .arg(input.path())
            .arg(output.path())
            .current_dir(work_dir)
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.program.display(), e))?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(format!("{} ({})", message, result.status))
    }
}

/// Validate a document, recording any problem as a warning
pub fn validate_model(
    validator: Option<&ModelValidator>,
    document: &SceneDocument,
    work_dir: &Path,
    warnings: &mut Warnings,
) {
    let Some(validator) = validator else {
        warnings.push(Warning::ValidationSkipped(format!(
            "{} was not found on PATH",
            COMPILE_EXECUTABLE
        )));
        return;
    };

    match validator.validate(document, work_dir) {
        Ok(()) => tracing::info!("Model compiled successfully"),
        Err(reason) => warnings.push(Warning::ValidationFailed(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneBuilder;
    use tempfile::tempdir;

    fn document() -> SceneDocument {
        SceneBuilder::new("empty").build()
    }

    #[test]
    fn test_missing_validator_is_a_warning() {
        let dir = tempdir().unwrap();
        let mut warnings = Warnings::new();
        validate_model(None, &document(), dir.path(), &mut warnings);

        assert!(matches!(
            warnings.iter().next(),
            Some(Warning::ValidationSkipped(_))
        ));
    }

    #[test]
    fn test_unrunnable_program_is_a_failure() {
        let dir = tempdir().unwrap();
        let validator = ModelValidator::new(PathBuf::from("/nonexistent/compile"));
        let mut warnings = Warnings::new();
        validate_model(Some(&validator), &document(), dir.path(), &mut warnings);

        assert!(matches!(
            warnings.iter().next(),
            Some(Warning::ValidationFailed(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_decides_and_scratch_is_removed() {
        let dir = tempdir().unwrap();

        if let Ok(ok) = which::which("true") {
            assert!(ModelValidator::new(ok).validate(&document(), dir.path()).is_ok());
        }
        if let Ok(fail) = which::which("false") {
            assert!(ModelValidator::new(fail).validate(&document(), dir.path()).is_err());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_assets_resolve_next_to_the_model_file() {
        use crate::material::Material;
        use std::os::unix::fs::PermissionsExt;

        let bin = tempdir().unwrap();
        let compiler = bin.path().join("compile");
        std::fs::write(
            &compiler,
            "#!/bin/sh\ntest -f \"$(dirname \"$1\")/cube.obj\" || { echo missing >&2; exit 1; }\n",
        )
        .unwrap();
        std::fs::set_permissions(&compiler, std::fs::Permissions::from_mode(0o755)).unwrap();

        let work_dir = tempdir().unwrap();
        std::fs::write(work_dir.path().join("cube.obj"), "v 0 0 0\n").unwrap();
        let mut builder = SceneBuilder::new("cube");
        builder.add_visual("cube", Path::new("cube.obj"), &Material::default_named("default"));
        let document = builder.build();

        let result = ModelValidator::new(compiler).validate(&document, work_dir.path());
        assert_eq!(result, Ok(()));

        let names: Vec<_> = std::fs::read_dir(work_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("cube.obj")]);
    }
}
