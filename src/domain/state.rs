//! Whole-run lifecycle states.

/// Lifecycle of one orchestrated run.
///
/// `Aborted` and `Completed` are terminal. `Aborted` is reached on a missing
/// environment, an activation failure, or any task failure; `Completed` only
/// after the last task succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing has happened yet
    Idle,

    /// Checking that the virtual environment exists
    LocatingEnvironment,

    /// Building the activated execution context
    ActivatingEnvironment,

    /// Executing the task at this index
    RunningTask(usize),

    /// The run stopped early (terminal)
    Aborted,

    /// Every task succeeded (terminal)
    Completed,
}

impl RunPhase {
    /// Whether this phase ends the run
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Aborted | RunPhase::Completed)
    }

    /// Legal transitions of the run lifecycle
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;

        match (self, next) {
            (Idle, LocatingEnvironment) => true,
            (LocatingEnvironment, ActivatingEnvironment) => true,
            (LocatingEnvironment, Aborted) => true,
            (ActivatingEnvironment, RunningTask(i)) => i == 0,
            (ActivatingEnvironment, Aborted) => true,
            (RunningTask(i), RunningTask(j)) => j == i + 1,
            (RunningTask(_), Aborted) => true,
            (RunningTask(_), Completed) => true,
            _ => false,
        }
    }
}
