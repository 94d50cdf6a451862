//! Main orchestrator for report runs.
//!
//! Coordinates the whole lifecycle: locate the virtual environment, activate
//! it into an execution context, then hand the task sequence to the runner.
//! Success is all-or-nothing across the sequence, in order.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::outcome::{
    EXIT_ACTIVATION_FAILED, EXIT_BAD_RUNBOOK, EXIT_ENV_NOT_FOUND, EXIT_TASK_FAILED,
};
use crate::domain::{RunOutcome, RunPhase};
use crate::status::StatusReporter;
use crate::venv::{ExecutionContext, Venv, VenvError};

use super::runbook::{Runbook, RunbookError};
use super::runner::{LaunchOptions, TaskLauncher, TaskRunner};

/// A fatal condition that stops a run before (or outside) the task loop.
///
/// Task failures are not represented here: they live inside the returned
/// `RunOutcome`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Venv(#[from] VenvError),

    #[error(transparent)]
    Runbook(#[from] RunbookError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RunError {
    /// Process exit code for this failure class, distinguishable for
    /// operational tooling
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Venv(e) if e.is_activation_failure() => EXIT_ACTIVATION_FAILED,
            RunError::Venv(_) => EXIT_ENV_NOT_FOUND,
            RunError::Runbook(_) => EXIT_BAD_RUNBOOK,
            RunError::Internal(_) => EXIT_TASK_FAILED,
        }
    }
}

/// Drives one run from environment discovery to the final verdict
pub struct Orchestrator {
    base_dir: PathBuf,
    env_dir_name: String,
    runner: TaskRunner,
}

impl Orchestrator {
    /// An orchestrator that spawns real subprocesses
    pub fn new(base_dir: PathBuf, env_dir_name: impl Into<String>, options: LaunchOptions) -> Self {
        Self {
            base_dir,
            env_dir_name: env_dir_name.into(),
            runner: TaskRunner::new(options),
        }
    }

    /// An orchestrator with a custom launcher (tests exercise the lifecycle
    /// without spawning anything)
    pub fn with_launcher(
        base_dir: PathBuf,
        env_dir_name: impl Into<String>,
        launcher: Box<dyn TaskLauncher>,
    ) -> Self {
        Self {
            base_dir,
            env_dir_name: env_dir_name.into(),
            runner: TaskRunner::with_launcher(launcher),
        }
    }

    /// Run the full sequence: locate the environment, activate it, execute
    /// every task in order.
    ///
    /// Task failures are reported inside the returned outcome; `Err` is
    /// reserved for fatal conditions that abort before the task loop. Every
    /// fatal condition produces a reporter message before this returns.
    #[instrument(skip(self, runbook, reporter), fields(runbook = %runbook.name))]
    pub async fn run(
        &self,
        runbook: &Runbook,
        reporter: &mut dyn StatusReporter,
    ) -> Result<RunOutcome, RunError> {
        match self.run_inner(runbook, reporter).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "run aborted");
                reporter.fatal(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        runbook: &Runbook,
        reporter: &mut dyn StatusReporter,
    ) -> Result<RunOutcome, RunError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, tasks = runbook.tasks.len(), "starting report run");

        runbook.validate()?;

        let mut phase = RunPhase::Idle;
        advance(&mut phase, RunPhase::LocatingEnvironment);

        let venv = match Venv::locate(&self.base_dir, &self.env_dir_name) {
            Ok(venv) => venv,
            Err(e) => {
                advance(&mut phase, RunPhase::Aborted);
                return Err(e.into());
            }
        };
        debug!(venv = %venv.root.display(), "environment located");

        advance(&mut phase, RunPhase::ActivatingEnvironment);

        let mut ctx = ExecutionContext::new(self.base_dir.clone(), venv.root.clone());
        if let Err(e) = ctx.activate(&venv) {
            advance(&mut phase, RunPhase::Aborted);
            return Err(e.into());
        }
        info!(venv = %venv.root.display(), "environment activated");

        advance(&mut phase, RunPhase::RunningTask(0));

        let outcome = self
            .runner
            .run(run_id, &runbook.tasks, &ctx, reporter)
            .await?;

        if outcome.all_succeeded {
            advance(&mut phase, RunPhase::Completed);
            info!(%run_id, tasks = outcome.results.len(), "all tasks succeeded");
        } else {
            advance(&mut phase, RunPhase::Aborted);
            if let Some(failed) = &outcome.failed {
                warn!(
                    %run_id,
                    task = %failed.task.name,
                    exit_code = failed.exit_code,
                    "run aborted on task failure"
                );
            }
        }

        Ok(outcome)
    }

    /// Validate the run's preconditions without launching anything: the
    /// runbook is well-formed and the environment is present
    pub fn preflight(&self, runbook: &Runbook) -> Result<Venv, RunError> {
        runbook.validate()?;
        Ok(Venv::locate(&self.base_dir, &self.env_dir_name)?)
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    debug_assert!(
        phase.can_advance_to(next),
        "illegal run phase transition: {phase:?} -> {next:?}"
    );
    debug!(from = ?*phase, to = ?next, "run phase transition");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    use crate::core::runner::LaunchOutput;
    use crate::domain::{Task, TaskResult};

    struct AlwaysOkLauncher;

    #[async_trait]
    impl TaskLauncher for AlwaysOkLauncher {
        async fn launch(&self, _task: &Task, _ctx: &ExecutionContext) -> Result<LaunchOutput> {
            Ok(LaunchOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        started: Vec<String>,
        fatals: Vec<String>,
    }

    impl StatusReporter for RecordingReporter {
        fn task_started(&mut self, task: &Task, _index: usize, _total: usize) {
            self.started.push(task.name.clone());
        }
        fn task_finished(&mut self, _result: &TaskResult) {}
        fn run_finished(&mut self, _outcome: &RunOutcome) {}
        fn fatal(&mut self, message: &str) {
            self.fatals.push(message.to_string());
        }
    }

    fn write_venv(base: &Path) {
        for sub in ["bin", "Scripts"] {
            let dir = base.join(".venv").join(sub);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("activate"), "# activation script\n").unwrap();
            std::fs::write(dir.join("activate.bat"), "rem activation script\r\n").unwrap();
            std::fs::write(dir.join("python"), "").unwrap();
            std::fs::write(dir.join("python.exe"), "").unwrap();
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        let not_found = RunError::Venv(VenvError::NotFound("/tmp/x/.venv".into()));
        assert_eq!(not_found.exit_code(), EXIT_ENV_NOT_FOUND);

        let activation = RunError::Venv(VenvError::AlreadyActive);
        assert_eq!(activation.exit_code(), EXIT_ACTIVATION_FAILED);

        let runbook = RunError::Runbook(RunbookError::Invalid("empty".into()));
        assert_eq!(runbook.exit_code(), EXIT_BAD_RUNBOOK);
    }

    #[tokio::test]
    async fn test_missing_environment_aborts_before_any_task() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::with_launcher(
            base.path().to_path_buf(),
            ".venv",
            Box::new(AlwaysOkLauncher),
        );
        let mut reporter = RecordingReporter::default();

        let err = orchestrator
            .run(&Runbook::builtin(), &mut reporter)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), EXIT_ENV_NOT_FOUND);
        assert!(reporter.started.is_empty());
        assert_eq!(reporter.fatals.len(), 1);
        assert!(reporter.fatals[0].contains("no virtual environment"));
    }

    #[tokio::test]
    async fn test_full_lifecycle_with_present_environment() {
        let base = TempDir::new().unwrap();
        write_venv(base.path());

        let orchestrator = Orchestrator::with_launcher(
            base.path().to_path_buf(),
            ".venv",
            Box::new(AlwaysOkLauncher),
        );
        let mut reporter = RecordingReporter::default();

        let outcome = orchestrator
            .run(&Runbook::builtin(), &mut reporter)
            .await
            .unwrap();

        assert!(outcome.all_succeeded);
        assert_eq!(reporter.started, ["revenue-report", "downloads-report"]);
        assert!(reporter.fatals.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_runbook_aborts_before_locating() {
        let base = TempDir::new().unwrap();
        let orchestrator = Orchestrator::with_launcher(
            base.path().to_path_buf(),
            ".venv",
            Box::new(AlwaysOkLauncher),
        );
        let mut reporter = RecordingReporter::default();

        let empty = Runbook {
            name: "empty".to_string(),
            description: "no tasks".to_string(),
            tasks: vec![],
        };

        let err = orchestrator.run(&empty, &mut reporter).await.unwrap_err();
        assert_eq!(err.exit_code(), EXIT_BAD_RUNBOOK);
        assert!(reporter.started.is_empty());
    }

    #[test]
    fn test_preflight_checks_without_launching() {
        let base = TempDir::new().unwrap();
        write_venv(base.path());

        let orchestrator = Orchestrator::new(
            base.path().to_path_buf(),
            ".venv",
            LaunchOptions::default(),
        );

        let venv = orchestrator.preflight(&Runbook::builtin()).unwrap();
        assert_eq!(venv.root, base.path().join(".venv"));
    }
}
