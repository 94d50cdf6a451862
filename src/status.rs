//! Progress reporting for report runs.
//!
//! The orchestrator and runner push lifecycle events through
//! `StatusReporter`; the console implementation turns them into
//! human-readable lines. Progress goes to stderr and echoed task output to
//! stdout, so report output stays pipeable.

use crate::domain::{RunOutcome, Task, TaskResult};

/// Sink for run lifecycle events
pub trait StatusReporter {
    /// Called immediately before a task is launched
    fn task_started(&mut self, task: &Task, index: usize, total: usize);

    /// Called after a task terminates, success or failure
    fn task_finished(&mut self, result: &TaskResult);

    /// Called once after the sequence completes or aborts
    fn run_finished(&mut self, outcome: &RunOutcome);

    /// Called for fatal conditions that stop the run before the task loop
    fn fatal(&mut self, message: &str);
}

/// Console reporter used by the CLI
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl StatusReporter for ConsoleReporter {
    fn task_started(&mut self, task: &Task, index: usize, total: usize) {
        eprintln!("\n🔹 [{}/{}] Running {}...", index + 1, total, task.name);
    }

    fn task_finished(&mut self, result: &TaskResult) {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }

        if result.succeeded {
            eprintln!("✅ {} finished OK in {}ms", result.task.name, result.duration_ms);
        } else if let Some(error) = &result.error {
            eprintln!("❌ {} could not be launched: {}", result.task.name, error);
        } else {
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
            eprintln!(
                "❌ {} failed with exit code {}",
                result.task.name, result.exit_code
            );
        }
    }

    fn run_finished(&mut self, outcome: &RunOutcome) {
        if outcome.all_succeeded {
            eprintln!(
                "\n✅ All {} reports completed successfully",
                outcome.results.len()
            );
        } else if let Some(failed) = &outcome.failed {
            eprintln!("\n❌ Run {} aborted: {} failed", outcome.run_id, failed.task.name);
        }
    }

    fn fatal(&mut self, message: &str) {
        eprintln!("❌ {message}");
    }
}
