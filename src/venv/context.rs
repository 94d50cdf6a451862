//! The activated execution context for task subprocesses.
//!
//! Activation never mutates the orchestrator's own process environment. The
//! environment changes live in an overlay applied to every launched task,
//! which keeps the "no task before activation" invariant checkable: the
//! context is created inactive, activated exactly once, and read-only from
//! then on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::locate::{Venv, VenvError};

/// Variables dropped from task environments when the overlay is applied.
/// An inherited PYTHONHOME would point the venv interpreter at the wrong
/// standard library.
const SCRUBBED: &[&str] = &["PYTHONHOME"];

/// Process context shared by every task in a run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    working_dir: PathBuf,
    env_path: PathBuf,
    overlay: HashMap<String, String>,
    active: bool,
}

impl ExecutionContext {
    /// A context that has not been activated yet. No task may be launched
    /// through it.
    pub fn new(working_dir: PathBuf, env_path: PathBuf) -> Self {
        Self {
            working_dir,
            env_path,
            overlay: HashMap::new(),
            active: false,
        }
    }

    /// Apply the environment's settings to this context.
    ///
    /// Verifies the activation script is readable, then prepends the
    /// environment's binary directory to PATH and sets VIRTUAL_ENV in the
    /// overlay. Flips `active` false -> true; a second activation is an
    /// error.
    pub fn activate(&mut self, venv: &Venv) -> Result<(), VenvError> {
        if self.active {
            return Err(VenvError::AlreadyActive);
        }

        std::fs::File::open(&venv.activate_script).map_err(|source| VenvError::Unreadable {
            script: venv.activate_script.clone(),
            source,
        })?;

        let mut paths = vec![venv.bin_dir.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        let path = std::env::join_paths(paths).map_err(|source| VenvError::Path {
            bin_dir: venv.bin_dir.clone(),
            source,
        })?;

        self.overlay
            .insert("PATH".to_string(), path.to_string_lossy().into_owned());
        self.overlay.insert(
            "VIRTUAL_ENV".to_string(),
            venv.root.to_string_lossy().into_owned(),
        );
        self.active = true;

        Ok(())
    }

    /// Whether the environment has been applied
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The working directory tasks run in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Root of the located environment
    pub fn env_path(&self) -> &Path {
        &self.env_path
    }

    /// Overlay value, if set
    pub fn env(&self, key: &str) -> Option<&str> {
        self.overlay.get(key).map(String::as_str)
    }

    /// Configure a task command: working directory plus the activated
    /// overlay, minus the scrubbed variables
    pub fn apply_to(&self, cmd: &mut Command) {
        cmd.current_dir(&self.working_dir);
        cmd.envs(&self.overlay);
        for key in SCRUBBED {
            cmd.env_remove(key);
        }
    }
}
