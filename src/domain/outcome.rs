//! Results of task and run execution, and the process exit-code mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Task;

/// Every task succeeded
pub const EXIT_OK: u8 = 0;
/// A task failed (or an unexpected internal error)
pub const EXIT_TASK_FAILED: u8 = 1;
/// The virtual environment was not located
pub const EXIT_ENV_NOT_FOUND: u8 = 2;
/// The activation artifact was present but could not be applied
pub const EXIT_ACTIVATION_FAILED: u8 = 3;
/// The runbook was missing or invalid
pub const EXIT_BAD_RUNBOOK: u8 = 4;

/// Termination record of a single task's subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task that ran
    pub task: Task,

    /// Numeric exit code of the subprocess (-1 when killed by a signal or
    /// never started)
    pub exit_code: i32,

    /// Whether the exit code matched the task's success sentinel
    pub succeeded: bool,

    /// Wall-clock time from launch to termination
    pub duration_ms: u64,

    /// Captured stdout (empty when output capture is off)
    #[serde(default)]
    pub stdout: String,

    /// Captured stderr (empty when output capture is off)
    #[serde(default)]
    pub stderr: String,

    /// Launch error when the subprocess could not be started at all
    pub error: Option<String>,
}

impl TaskResult {
    /// Record a task that terminated with `exit_code`
    pub fn from_exit(
        task: Task,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
    ) -> Self {
        let succeeded = task.is_success(exit_code);
        Self {
            task,
            exit_code,
            succeeded,
            duration_ms,
            stdout,
            stderr,
            error: None,
        }
    }

    /// Record a task whose subprocess could not be started or waited on
    pub fn launch_failure(task: Task, error: String, duration_ms: u64) -> Self {
        Self {
            task,
            exit_code: -1,
            succeeded: false,
            duration_ms,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}

/// Aggregate verdict for one full execution of the task sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// True iff every task in the sequence succeeded
    pub all_succeeded: bool,

    /// The failing task's result, when the run aborted
    pub failed: Option<TaskResult>,

    /// Results of the tasks that ran, in order (fail-fast: nothing after the
    /// first failure)
    pub results: Vec<TaskResult>,

    /// When the sequence started
    pub started_at: DateTime<Utc>,

    /// When the sequence completed or aborted
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// Derive the verdict from the results collected so far
    pub fn from_results(run_id: Uuid, started_at: DateTime<Utc>, results: Vec<TaskResult>) -> Self {
        let failed = results.iter().find(|r| !r.succeeded).cloned();
        Self {
            run_id,
            all_succeeded: failed.is_none(),
            failed,
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Process exit code: 0 iff every task succeeded
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded {
            EXIT_OK
        } else {
            EXIT_TASK_FAILED
        }
    }
}
