//! Runbook definitions and loading.
//!
//! A runbook is the fixed ordered list of report tasks for one run, defined
//! in YAML. Order is significant: tasks run strictly in list order and the
//! first failure stops the run. Keeping the list as data (rather than inline
//! calls) lets the fail-fast loop and the task configuration be tested
//! independently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Task;

/// Errors from loading or validating a runbook
#[derive(Debug, Error)]
pub enum RunbookError {
    #[error("failed to read runbook {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse runbook: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid runbook: {0}")]
    Invalid(String),
}

/// An ordered sequence of report tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runbook {
    /// Runbook name (used in progress output)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Ordered list of tasks to execute
    pub tasks: Vec<Task>,
}

impl Runbook {
    /// Load a runbook from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, RunbookError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunbookError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    /// Parse a runbook from YAML content
    pub fn from_yaml(content: &str) -> Result<Self, RunbookError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validate the runbook definition
    pub fn validate(&self) -> Result<(), RunbookError> {
        if self.name.is_empty() {
            return Err(RunbookError::Invalid("runbook name cannot be empty".into()));
        }

        if self.tasks.is_empty() {
            return Err(RunbookError::Invalid(
                "runbook must have at least one task".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, task) in self.tasks.iter().enumerate() {
            if task.name.is_empty() {
                return Err(RunbookError::Invalid(format!("task {i} has an empty name")));
            }

            if task.command.is_empty() {
                return Err(RunbookError::Invalid(format!(
                    "task '{}' has an empty command",
                    task.name
                )));
            }

            if !seen.insert(task.name.as_str()) {
                return Err(RunbookError::Invalid(format!(
                    "duplicate task name '{}'",
                    task.name
                )));
            }
        }

        Ok(())
    }

    /// The fixed report sequence used when no runbook file is configured:
    /// the nightly revenue and downloads reports, run via the activated
    /// interpreter
    pub fn builtin() -> Self {
        Self {
            name: "nightly-reports".to_string(),
            description: "Generate the nightly business reports in order".to_string(),
            tasks: vec![
                Task::new("revenue-report", "python", ["scripts/revenue_report.py"]),
                Task::new("downloads-report", "python", ["scripts/downloads_report.py"]),
            ],
        }
    }

    /// Resolve the runbook for a run: an explicit path if given, otherwise
    /// `<base>/runbook.yaml` if present, otherwise the built-in sequence.
    /// The result is always validated.
    pub fn load_or_builtin(path: Option<&Path>, base: &Path) -> Result<Self, RunbookError> {
        let runbook = if let Some(path) = path {
            Self::from_file(path)?
        } else {
            let default_path = base.join("runbook.yaml");
            if default_path.is_file() {
                Self::from_file(&default_path)?
            } else {
                Self::builtin()
            }
        };

        runbook.validate()?;
        Ok(runbook)
    }
}
