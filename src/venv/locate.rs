//! Discovery of the isolated Python environment.
//!
//! A run only proceeds if the configured base directory contains a virtual
//! environment with its activation script and interpreter in place.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(unix)]
const BIN_DIR: &str = "bin";
#[cfg(windows)]
const BIN_DIR: &str = "Scripts";

#[cfg(unix)]
const ACTIVATE: &str = "activate";
#[cfg(windows)]
const ACTIVATE: &str = "activate.bat";

#[cfg(unix)]
const INTERPRETER: &str = "python";
#[cfg(windows)]
const INTERPRETER: &str = "python.exe";

/// Errors from locating or activating the virtual environment
#[derive(Debug, Error)]
pub enum VenvError {
    #[error("no virtual environment at {}", .0.display())]
    NotFound(PathBuf),

    #[error(
        "virtual environment at {} has no activation script (expected {})",
        .root.display(),
        .script.display()
    )]
    MissingActivationScript { root: PathBuf, script: PathBuf },

    #[error(
        "virtual environment at {} has no interpreter (expected {})",
        .root.display(),
        .interpreter.display()
    )]
    MissingInterpreter { root: PathBuf, interpreter: PathBuf },

    #[error("activation script {} is unreadable: {source}", .script.display())]
    Unreadable {
        script: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot extend PATH with {}: {source}", .bin_dir.display())]
    Path {
        bin_dir: PathBuf,
        source: std::env::JoinPathsError,
    },

    #[error("execution context is already active")]
    AlreadyActive,
}

impl VenvError {
    /// Activation failures (artifact present but unusable) are reported with a
    /// different exit code than "environment not found"
    pub fn is_activation_failure(&self) -> bool {
        matches!(
            self,
            VenvError::Unreadable { .. } | VenvError::Path { .. } | VenvError::AlreadyActive
        )
    }
}

/// A located virtual environment
#[derive(Debug, Clone)]
pub struct Venv {
    /// Environment root (`<base>/<env_dir_name>`)
    pub root: PathBuf,

    /// Directory holding the environment's executables
    pub bin_dir: PathBuf,

    /// The activation artifact
    pub activate_script: PathBuf,

    /// The environment's interpreter
    pub interpreter: PathBuf,
}

impl Venv {
    /// Check for a virtual environment named `env_dir_name` under `base`.
    ///
    /// Filesystem existence checks only; nothing is created or modified.
    pub fn locate(base: &Path, env_dir_name: &str) -> Result<Self, VenvError> {
        let root = base.join(env_dir_name);
        if !root.is_dir() {
            return Err(VenvError::NotFound(root));
        }

        let bin_dir = root.join(BIN_DIR);

        let activate_script = bin_dir.join(ACTIVATE);
        if !activate_script.is_file() {
            return Err(VenvError::MissingActivationScript {
                root,
                script: activate_script,
            });
        }

        let interpreter = bin_dir.join(INTERPRETER);
        if !interpreter.is_file() {
            return Err(VenvError::MissingInterpreter { root, interpreter });
        }

        Ok(Self {
            root,
            bin_dir,
            activate_script,
            interpreter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Lay out a venv skeleton that satisfies the locator on any platform
    fn write_venv(base: &Path, name: &str) {
        let bin = base.join(name).join(BIN_DIR);
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(ACTIVATE), "# activation script\n").unwrap();
        std::fs::write(bin.join(INTERPRETER), "").unwrap();
    }

    #[test]
    fn test_locate_complete_environment() {
        let base = TempDir::new().unwrap();
        write_venv(base.path(), ".venv");

        let venv = Venv::locate(base.path(), ".venv").unwrap();

        assert_eq!(venv.root, base.path().join(".venv"));
        assert_eq!(venv.bin_dir, venv.root.join(BIN_DIR));
        assert!(venv.activate_script.is_file());
        assert!(venv.interpreter.is_file());
    }

    #[test]
    fn test_missing_environment_directory() {
        let base = TempDir::new().unwrap();

        let err = Venv::locate(base.path(), ".venv").unwrap_err();

        assert!(matches!(err, VenvError::NotFound(_)));
        assert!(!err.is_activation_failure());
    }

    #[test]
    fn test_missing_activation_script() {
        let base = TempDir::new().unwrap();
        std::fs::create_dir_all(base.path().join(".venv").join(BIN_DIR)).unwrap();

        let err = Venv::locate(base.path(), ".venv").unwrap_err();

        assert!(matches!(err, VenvError::MissingActivationScript { .. }));
    }

    #[test]
    fn test_missing_interpreter() {
        let base = TempDir::new().unwrap();
        let bin = base.path().join(".venv").join(BIN_DIR);
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(ACTIVATE), "# activation script\n").unwrap();

        let err = Venv::locate(base.path(), ".venv").unwrap_err();

        assert!(matches!(err, VenvError::MissingInterpreter { .. }));
    }

    #[test]
    fn test_custom_environment_name() {
        let base = TempDir::new().unwrap();
        write_venv(base.path(), "env310");

        let venv = Venv::locate(base.path(), "env310").unwrap();
        assert_eq!(venv.root, base.path().join("env310"));
    }
}
