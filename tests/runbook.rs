//! Runbook loading and validation from disk.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use reportrun::{Runbook, RunbookError};

#[test]
fn test_load_runbook_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("runbook.yaml");
    fs::write(
        &path,
        r#"
name: weekly
description: Weekly reports

tasks:
  - name: revenue-report
    command: python
    args: [scripts/revenue_report.py]
"#,
    )
    .unwrap();

    let runbook = Runbook::from_file(&path).unwrap();

    assert_eq!(runbook.name, "weekly");
    assert_eq!(runbook.tasks.len(), 1);
    assert_eq!(runbook.tasks[0].command, "python");
}

#[test]
fn test_missing_file_is_an_io_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nope.yaml");

    let err = Runbook::from_file(&path).unwrap_err();
    assert!(matches!(err, RunbookError::Io { .. }));
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("runbook.yaml");
    fs::write(&path, "name: [unclosed").unwrap();

    let err = Runbook::from_file(&path).unwrap_err();
    assert!(matches!(err, RunbookError::Parse(_)));
}

#[test]
fn test_explicit_path_wins_over_default() {
    let temp = TempDir::new().unwrap();

    // A default runbook in the base directory...
    fs::write(
        temp.path().join("runbook.yaml"),
        r#"
name: default-book
description: Default
tasks:
  - name: a
    command: python
"#,
    )
    .unwrap();

    // ...and an explicitly named one elsewhere
    let explicit = temp.path().join("other.yaml");
    fs::write(
        &explicit,
        r#"
name: explicit-book
description: Explicit
tasks:
  - name: b
    command: python
"#,
    )
    .unwrap();

    let runbook = Runbook::load_or_builtin(Some(&explicit), temp.path()).unwrap();
    assert_eq!(runbook.name, "explicit-book");
}

#[test]
fn test_default_runbook_in_base_is_picked_up() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("runbook.yaml"),
        r#"
name: default-book
description: Default
tasks:
  - name: a
    command: python
"#,
    )
    .unwrap();

    let runbook = Runbook::load_or_builtin(None, temp.path()).unwrap();
    assert_eq!(runbook.name, "default-book");
}

#[test]
fn test_builtin_used_when_nothing_configured() {
    let temp = TempDir::new().unwrap();

    let runbook = Runbook::load_or_builtin(None, temp.path()).unwrap();

    assert_eq!(runbook.name, "nightly-reports");
    assert_eq!(runbook.tasks.len(), 2);
}

#[test]
fn test_loaded_runbook_is_validated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("runbook.yaml");
    fs::write(
        &path,
        r#"
name: broken
description: Duplicate task names
tasks:
  - name: a
    command: python
  - name: a
    command: python
"#,
    )
    .unwrap();

    let err = Runbook::load_or_builtin(Some(&path), temp.path()).unwrap_err();
    assert!(matches!(err, RunbookError::Invalid(_)));
}

#[test]
fn test_shipped_example_runbook_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("runbooks/nightly.yaml");

    let runbook = Runbook::from_file(&path).unwrap();

    assert!(runbook.validate().is_ok());
    assert_eq!(runbook.name, "nightly-reports");
    assert_eq!(runbook.tasks[0].name, "revenue-report");
}
