//! Configuration for reportrun paths and run behavior.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (REPORTRUN_BASE, REPORTRUN_ENV_DIR, REPORTRUN_RUNBOOK)
//! 2. Project config file (.reportrun/config.yaml, found by upward search)
//! 3. User config file (~/.reportrun/config.yaml)
//! 4. Defaults (base = current directory, env dir = .venv)
//!
//! Paths in a config file are relative to the config file's project root.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: Option<RunSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Base working directory (relative to the project root)
    pub base: Option<String>,
    /// Virtual environment directory name under the base
    pub env_dir: Option<String>,
    /// Runbook file (relative to the project root)
    pub runbook: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    pub capture_output: Option<bool>,
    pub task_timeout_seconds: Option<u64>,
    pub attended: Option<bool>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Base directory holding the environment and the report scripts
    pub base_dir: PathBuf,
    /// Virtual environment directory name under the base
    pub env_dir_name: String,
    /// Explicitly configured runbook file (if any)
    pub runbook_path: Option<PathBuf>,
    /// Capture task output and echo it after completion
    pub capture_output: bool,
    /// Optional per-task wall-clock limit
    pub task_timeout_seconds: Option<u64>,
    /// Pause for operator acknowledgment on failure
    pub attended: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find a config file: project config by upward search, then user-level
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(".reportrun").join("config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    let home = dirs::home_dir()?.join(".reportrun").join("config.yaml");
    home.exists().then_some(home)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let (mut base_dir, mut env_dir_name, mut runbook_path, capture_output, timeout, attended) =
        if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;

            // Project root is the parent of .reportrun/
            let project_root = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();

            let base_dir = config
                .paths
                .base
                .as_deref()
                .map(|b| resolve_path(&project_root, b))
                .unwrap_or_else(|| project_root.clone());

            let runbook_path = config
                .paths
                .runbook
                .as_deref()
                .map(|r| resolve_path(&project_root, r));

            let env_dir_name = config.paths.env_dir.unwrap_or_else(|| ".venv".to_string());

            let capture_output = config
                .run
                .as_ref()
                .and_then(|r| r.capture_output)
                .unwrap_or(true);
            let timeout = config.run.as_ref().and_then(|r| r.task_timeout_seconds);
            let attended = config.run.as_ref().and_then(|r| r.attended).unwrap_or(false);

            (base_dir, env_dir_name, runbook_path, capture_output, timeout, attended)
        } else {
            let base_dir = std::env::current_dir().context("Failed to determine current directory")?;
            (base_dir, ".venv".to_string(), None, true, None, false)
        };

    // Environment variable overrides
    if let Ok(base) = std::env::var("REPORTRUN_BASE") {
        base_dir = PathBuf::from(base);
    }
    if let Ok(env_dir) = std::env::var("REPORTRUN_ENV_DIR") {
        env_dir_name = env_dir;
    }
    if let Ok(runbook) = std::env::var("REPORTRUN_RUNBOOK") {
        runbook_path = Some(PathBuf::from(runbook));
    }

    Ok(ResolvedConfig {
        base_dir,
        env_dir_name,
        runbook_path,
        capture_output,
        task_timeout_seconds: timeout,
        attended,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_without_file() {
        // A config file on the machine (or REPORTRUN_* vars) would shadow the
        // defaults this test asserts
        if find_config_file().is_some() || std::env::var("REPORTRUN_BASE").is_ok() {
            return;
        }

        let config = load_config().unwrap();

        assert_eq!(config.base_dir, std::env::current_dir().unwrap());
        assert_eq!(config.env_dir_name, ".venv");
        assert!(config.runbook_path.is_none());
        assert!(config.capture_output);
        assert!(config.task_timeout_seconds.is_none());
        assert!(!config.attended);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let reportrun_dir = temp.path().join(".reportrun");
        std::fs::create_dir_all(&reportrun_dir).unwrap();

        let config_path = reportrun_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  base: ./
  env_dir: env310
  runbook: runbooks/nightly.yaml
run:
  capture_output: false
  task_timeout_seconds: 900
  attended: true
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.base, Some("./".to_string()));
        assert_eq!(config.paths.env_dir, Some("env310".to_string()));
        assert_eq!(
            config.paths.runbook,
            Some("runbooks/nightly.yaml".to_string())
        );

        let run = config.run.unwrap();
        assert_eq!(run.capture_output, Some(false));
        assert_eq!(run.task_timeout_seconds, Some(900));
        assert_eq!(run.attended, Some(true));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
