//! Loading editor configuration from disk and wiring it into the editor.

use edit_guard::config::{load_from_path, ConfigError, ValidationIssue};
use edit_guard::{
    EditOperation, EditRequest, ErrorKind, FileTimeTracker, MultiEditor, PathResolver,
    StrategyKind,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_workspace_config_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("project")).unwrap();
    fs::create_dir(dir.path().join("project/vendor")).unwrap();
    let config_path = dir.path().join("edit-guard.toml");
    fs::write(
        &config_path,
        r#"
[matching]
context_threshold = 0.75
disabled_strategies = ["block-anchor"]

[workspace]
root = "project"
enforce_boundary = true
forbidden = ["vendor"]
"#,
    )
    .unwrap();

    let config = load_from_path(&config_path).unwrap();
    assert_eq!(config.matching.context_threshold, 0.75);
    assert_eq!(
        config.matching.disabled_strategies,
        vec![StrategyKind::BlockAnchor]
    );

    let editor = MultiEditor::from_config(&config).unwrap();
    assert!(!editor
        .replacer()
        .strategies()
        .any(|kind| kind == StrategyKind::BlockAnchor));

    let tracker = FileTimeTracker::with_resolver(PathResolver::new(dir.path()).unwrap());
    let forbidden =
        EditRequest::new("project/vendor/lib.rs", vec![EditOperation::new("", "x")]).unwrap();
    let err = editor.apply(&tracker, &forbidden).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutsideWorkspace);

    let allowed =
        EditRequest::new("project/main.rs", vec![EditOperation::new("", "fn main() {}\n")])
            .unwrap();
    editor.apply(&tracker, &allowed).unwrap();
    assert!(dir.path().join("project/main.rs").exists());
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_invalid_config_reports_every_issue() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("edit-guard.toml");
    fs::write(
        &config_path,
        "[matching]\nblock_anchor_threshold = -0.1\ncontext_threshold = 2.0\n",
    )
    .unwrap();

    let err = load_from_path(&config_path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("edit-guard.toml"));
    assert!(message.contains("matching.block_anchor_threshold"));
    assert!(message.contains("matching.context_threshold"));

    match err {
        ConfigError::Validation { source, .. } => {
            assert!(source
                .issues
                .iter()
                .all(|issue| matches!(issue, ValidationIssue::ThresholdOutOfRange { .. })));
        }
        other => panic!("expected validation error, got {other}"),
    }
}
