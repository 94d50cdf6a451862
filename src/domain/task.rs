//! Task descriptors for the report sequence.
//!
//! A task is one external report-generation step: a named command with
//! fixed arguments, executed to completion before the next one begins.

use serde::{Deserialize, Serialize};

/// One external report-generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task name (unique within a runbook)
    pub name: String,

    /// Executable to invoke (absolute path, or resolved via the activated PATH)
    pub command: String,

    /// Arguments passed to the command, in order
    #[serde(default)]
    pub args: Vec<String>,

    /// Exit code that counts as success for this task (0 unless the task
    /// documents a different sentinel)
    #[serde(default)]
    pub success_code: i32,
}

impl Task {
    /// Create a task with the default success code (0)
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            success_code: 0,
        }
    }

    /// Whether `exit_code` is this task's success signal
    pub fn is_success(&self, exit_code: i32) -> bool {
        exit_code == self.success_code
    }

    /// Full command line for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
