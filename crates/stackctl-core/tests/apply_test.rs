//! Diff and apply integration tests
//!
//! Observes a fake Claude home, diffs a profile against it and applies the
//! result through a recording runner.

use stackctl_core::apply::{
    apply_diff, ApplyOptions, CommandError, CommandRunner, Phase, RecordingProgress,
};
use stackctl_core::diff::{compute_diff, is_first_run, plan_reset, DiffSummary};
use stackctl_core::profile::Profile;
use stackctl_core::stackctl_scanner::{
    ClaudePaths, FsObserver, Marketplace, ObservedState, Scope, StateObserver,
};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Records every invocation and fails those containing `fail_on`
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl CommandRunner for RecordingRunner {
    fn run_with_output(&self, args: &[String]) -> Result<String, CommandError> {
        let line = args.join(" ");
        self.calls.lock().unwrap().push(line.clone());
        match self.fail_on {
            Some(marker) if line.contains(marker) => Err(CommandError::Failed {
                command: line,
                output: "network unreachable".to_string(),
            }),
            _ => Ok(String::new()),
        }
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("create parent dir");
    fs::write(path, content).expect("write fixture file");
}

fn observe_fixture(home: &TempDir, project: &TempDir) -> ObservedState {
    let paths = ClaudePaths::new(home.path(), project.path());
    write(
        &paths.settings_path(Scope::User),
        r#"{ "enabledPlugins": { "fmt@tools": true, "old@tools": true } }"#,
    );
    write(
        &paths.known_marketplaces(),
        r#"{ "tools": { "source": { "source": "github", "repo": "acme/tools" } } }"#,
    );
    write(
        &paths.claude_json(),
        r#"{ "mcpServers": { "github": { "command": "gh-mcp" } } }"#,
    );
    FsObserver::new(paths)
        .observe_all()
        .expect("observe fixture state")
}

fn web_profile() -> Profile {
    serde_json::from_str(
        r#"{
            "name": "web",
            "plugins": ["fmt@tools", "lint@web"],
            "marketplaces": [
                {"source": "github", "repo": "acme/tools"},
                {"source": "github", "repo": "acme/web"}
            ],
            "mcpServers": [{"name": "github", "command": "gh-mcp"}]
        }"#,
    )
    .expect("parse profile")
}

#[test]
fn test_diff_against_observed_user_scope() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let state = observe_fixture(&home, &project);

    let diff = compute_diff(&web_profile(), &state, Scope::User);

    assert_eq!(diff.plugins_to_install, vec!["fmt@tools", "lint@web"]);
    assert_eq!(diff.plugins_to_remove, vec!["old@tools"]);
    assert_eq!(diff.marketplaces_to_add, vec![Marketplace::github("acme/web")]);
    assert!(diff.marketplaces_to_remove.is_empty());
    assert!(diff.mcp_to_install.is_empty());
    assert!(diff.mcp_to_remove.is_empty());
    assert!(diff.warnings.is_empty());

    let summary = DiffSummary::from_diff(&diff);
    assert_eq!(summary.installs, 2);
    assert_eq!(summary.removes, 1);
    assert_eq!(summary.marketplace_adds, 1);
}

#[test]
fn test_project_scope_leaves_user_plugins_alone() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let state = observe_fixture(&home, &project);

    let diff = compute_diff(&web_profile(), &state, Scope::Project);
    assert!(diff.plugins_to_remove.is_empty());
    assert!(diff.mcp_to_remove.is_empty());
    assert_eq!(diff.plugins_to_install.len(), 2);
}

#[test]
fn test_apply_runs_host_commands_by_phase() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let state = observe_fixture(&home, &project);
    let diff = compute_diff(&web_profile(), &state, Scope::User);

    let runner = RecordingRunner::default();
    let mut progress = RecordingProgress::default();
    let report = apply_diff(&diff, &runner, ApplyOptions { workers: 2 }, &mut progress);

    assert!(report.is_success());
    assert_eq!(report.total(), 4);
    assert_eq!(
        progress.phases,
        vec![(Phase::Remove, 1), (Phase::Marketplaces, 1), (Phase::Install, 2)]
    );

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls[0], "plugin uninstall --scope=user old");
    assert_eq!(calls[1], "plugin marketplace add acme/web");
    assert!(calls[2..].contains(&"plugin install --scope=user lint@web".to_string()));
    assert!(calls[2..].contains(&"plugin install --scope=user fmt@tools".to_string()));
}

#[test]
fn test_failed_marketplace_does_not_stop_installs() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let state = observe_fixture(&home, &project);
    let diff = compute_diff(&web_profile(), &state, Scope::User);

    let runner = RecordingRunner {
        fail_on: Some("marketplace add"),
        ..RecordingRunner::default()
    };
    let report = apply_diff(&diff, &runner, ApplyOptions::default(), &mut RecordingProgress::default());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "acme/web");
    assert!(failures[0].error().unwrap().to_string().contains("network unreachable"));
    assert_eq!(report.succeeded(), 3);
}

#[test]
fn test_first_run_and_reset() {
    let home = TempDir::new().expect("Failed to create temp dir");
    let project = TempDir::new().expect("Failed to create temp dir");
    let state = observe_fixture(&home, &project);

    assert!(!is_first_run(&[Marketplace::github("acme/tools")], &state));
    assert!(is_first_run(&[Marketplace::github("acme/web")], &state));

    let reset = plan_reset(&web_profile(), &state, Scope::User);
    assert_eq!(reset.plugins_to_remove, vec!["fmt@tools"]);
    assert_eq!(reset.mcp_to_remove, vec!["github"]);
    // old@tools stays enabled and still uses the tools marketplace
    assert!(reset.marketplaces_to_remove.is_empty());
}
