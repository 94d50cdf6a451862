//! Sequential task execution.
//!
//! Tasks run strictly one at a time through the `TaskLauncher` seam; the
//! production launcher spawns each task as a subprocess with the activated
//! environment overlay and waits for it to terminate. The wait has no
//! timeout unless one is configured: a hung task blocks the whole run.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{RunOutcome, Task, TaskResult};
use crate::status::StatusReporter;
use crate::venv::ExecutionContext;

/// How task subprocesses are launched
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Capture task stdout/stderr and echo after completion (stderr only on
    /// failure). When false, tasks inherit the console directly.
    pub capture_output: bool,

    /// Optional per-task wall-clock limit. Off by default: a hung task
    /// blocks the run indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            capture_output: true,
            timeout: None,
        }
    }
}

/// Termination record of one launched subprocess
#[derive(Debug, Clone)]
pub struct LaunchOutput {
    /// Numeric exit code (-1 when killed by a signal)
    pub exit_code: i32,

    /// Captured stdout (empty when capture is off)
    pub stdout: String,

    /// Captured stderr (empty when capture is off)
    pub stderr: String,
}

/// Seam between the runner and the operating system.
///
/// An `Err` from `launch` means the task could not be started or waited on
/// at all; the runner records it as a task failure, not an orchestrator
/// crash.
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// Launch `task` through the activated context and wait for it to
    /// terminate
    async fn launch(&self, task: &Task, ctx: &ExecutionContext) -> Result<LaunchOutput>;
}

/// Launcher that spawns real subprocesses
pub struct SubprocessLauncher {
    options: LaunchOptions,
}

impl SubprocessLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl TaskLauncher for SubprocessLauncher {
    async fn launch(&self, task: &Task, ctx: &ExecutionContext) -> Result<LaunchOutput> {
        let mut cmd = Command::new(&task.command);
        cmd.args(&task.args).stdin(Stdio::null());
        ctx.apply_to(&mut cmd);

        if self.options.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn '{}' for task '{}'",
                task.command, task.name
            )
        })?;

        let output = match self.options.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    anyhow::anyhow!("task '{}' timed out after {:?}", task.name, limit)
                })?,
            None => child.wait_with_output().await,
        }
        .with_context(|| format!("failed to wait for task '{}'", task.name))?;

        // A signal death has no exit code; report it as -1
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(LaunchOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs the task sequence in order, stopping at the first failure
pub struct TaskRunner {
    launcher: Box<dyn TaskLauncher>,
}

impl TaskRunner {
    /// A runner backed by real subprocesses
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            launcher: Box::new(SubprocessLauncher::new(options)),
        }
    }

    /// A runner with a custom launcher (tests exercise the loop without
    /// spawning anything)
    pub fn with_launcher(launcher: Box<dyn TaskLauncher>) -> Self {
        Self { launcher }
    }

    /// Execute `tasks` in order through the activated context.
    ///
    /// Refuses to start if the context has not been activated. The first
    /// failing task aborts the remainder of the sequence; the reporter is
    /// notified after every task and once at the end.
    pub async fn run(
        &self,
        run_id: Uuid,
        tasks: &[Task],
        ctx: &ExecutionContext,
        reporter: &mut dyn StatusReporter,
    ) -> Result<RunOutcome> {
        anyhow::ensure!(
            ctx.is_active(),
            "tasks cannot run before the environment is activated"
        );

        let started_at = Utc::now();
        let total = tasks.len();
        let mut results = Vec::with_capacity(total);

        for (index, task) in tasks.iter().enumerate() {
            reporter.task_started(task, index, total);
            info!(task = %task.name, index, "starting task");

            let clock = Instant::now();
            let result = match self.launcher.launch(task, ctx).await {
                Ok(output) => TaskResult::from_exit(
                    task.clone(),
                    output.exit_code,
                    output.stdout,
                    output.stderr,
                    clock.elapsed().as_millis() as u64,
                ),
                Err(e) => TaskResult::launch_failure(
                    task.clone(),
                    format!("{e:#}"),
                    clock.elapsed().as_millis() as u64,
                ),
            };

            if result.succeeded {
                info!(
                    task = %task.name,
                    exit_code = result.exit_code,
                    duration_ms = result.duration_ms,
                    "task finished"
                );
            } else {
                error!(
                    task = %task.name,
                    exit_code = result.exit_code,
                    "task failed, aborting remaining tasks"
                );
            }

            reporter.task_finished(&result);

            let failed = !result.succeeded;
            results.push(result);
            if failed {
                break;
            }
        }

        let outcome = RunOutcome::from_results(run_id, started_at, results);
        reporter.run_finished(&outcome);

        Ok(outcome)
    }
}
