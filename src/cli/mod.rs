//! Command-line interface for reportrun.
//!
//! Provides commands for running the report sequence, preflighting the
//! environment and runbook, and inspecting resolved configuration.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config;
use crate::core::{LaunchOptions, Orchestrator, RunError, Runbook};
use crate::domain::outcome::EXIT_OK;
use crate::status::{ConsoleReporter, StatusReporter};

/// reportrun - sequential report-pipeline runner
#[derive(Parser, Debug)]
#[command(name = "reportrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the report sequence
    Run {
        /// Runbook file (defaults to the configured runbook, then
        /// <base>/runbook.yaml, then the built-in sequence)
        #[arg(short, long)]
        runbook: Option<PathBuf>,

        /// Base directory containing the virtual environment and the report
        /// scripts
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Wait for Enter before exiting on failure (attended terminals)
        #[arg(long)]
        attended: bool,
    },

    /// Verify the environment and runbook without running any task
    Check {
        /// Runbook file to validate
        #[arg(short, long)]
        runbook: Option<PathBuf>,

        /// Base directory to check
        #[arg(short, long)]
        base: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub async fn execute(self) -> Result<u8> {
        match self.command {
            Commands::Run {
                runbook,
                base,
                attended,
            } => run_reports(runbook, base, attended).await,
            Commands::Check { runbook, base } => check(runbook, base),
            Commands::Config => show_config(),
        }
    }
}

/// Run the full report sequence
async fn run_reports(
    runbook_flag: Option<PathBuf>,
    base_flag: Option<PathBuf>,
    attended_flag: bool,
) -> Result<u8> {
    let cfg = config::config()?;

    let base = base_flag.unwrap_or_else(|| cfg.base_dir.clone());
    let attended = attended_flag || cfg.attended;
    let runbook_path = runbook_flag.or_else(|| cfg.runbook_path.clone());
    let options = LaunchOptions {
        capture_output: cfg.capture_output,
        timeout: cfg.task_timeout_seconds.map(Duration::from_secs),
    };

    let mut reporter = ConsoleReporter::new();

    let code = match Runbook::load_or_builtin(runbook_path.as_deref(), &base) {
        Err(e) => {
            reporter.fatal(&e.to_string());
            RunError::from(e).exit_code()
        }
        Ok(runbook) => {
            let orchestrator = Orchestrator::new(base, cfg.env_dir_name.clone(), options);
            match orchestrator.run(&runbook, &mut reporter).await {
                Ok(outcome) => outcome.exit_code(),
                Err(e) => e.exit_code(),
            }
        }
    };

    if attended && code != EXIT_OK {
        pause_for_operator();
    }

    Ok(code)
}

/// Verify preconditions without launching anything
fn check(runbook_flag: Option<PathBuf>, base_flag: Option<PathBuf>) -> Result<u8> {
    let cfg = config::config()?;

    let base = base_flag.unwrap_or_else(|| cfg.base_dir.clone());
    let runbook_path = runbook_flag.or_else(|| cfg.runbook_path.clone());

    let runbook = match Runbook::load_or_builtin(runbook_path.as_deref(), &base) {
        Ok(runbook) => runbook,
        Err(e) => {
            eprintln!("❌ {e}");
            return Ok(RunError::from(e).exit_code());
        }
    };

    let orchestrator = Orchestrator::new(base, cfg.env_dir_name.clone(), LaunchOptions::default());

    match orchestrator.preflight(&runbook) {
        Ok(venv) => {
            println!("environment: {}", venv.root.display());
            println!("runbook: {} ({} tasks)", runbook.name, runbook.tasks.len());
            for task in &runbook.tasks {
                println!("  {} -> {}", task.name, task.command_line());
            }
            Ok(EXIT_OK)
        }
        Err(e) => {
            eprintln!("❌ {e}");
            Ok(e.exit_code())
        }
    }
}

/// Print the resolved configuration
fn show_config() -> Result<u8> {
    let cfg = config::config()?;
    println!("{}", serde_json::to_string_pretty(cfg)?);
    Ok(EXIT_OK)
}

/// Keep an attended terminal window open until the operator has read the
/// failure
fn pause_for_operator() {
    eprintln!("\nPress Enter to close...");
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}
