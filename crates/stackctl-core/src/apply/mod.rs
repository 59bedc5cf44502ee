//! Phased application of a diff
//!
//! Phases run one after the other, each as its own worker pool batch:
//! removals first, then marketplace changes, then installs. Plugin installs
//! resolve names through the marketplace registry, so every marketplace job
//! has finished before any install starts. Within a phase jobs run
//! concurrently and in no particular order.

pub mod command;
pub mod executor;
mod jobs;
pub mod post_apply;
pub mod progress;

pub use command::{ClaudeCli, CommandError, CommandRunner};
pub use executor::{run_jobs, Job, JobError, JobKind, JobResult, DEFAULT_WORKERS};
pub use jobs::phase_jobs;
pub use post_apply::{run_post_apply, should_run_post_apply, PostApplyError};
pub use progress::{NoProgress, Phase, ProgressEvent, ProgressSink, RecordingProgress};

use crate::diff::DiffResult;
use chrono::{DateTime, Utc};
use stackctl_scanner::Scope;
use uuid::Uuid;

/// Apply settings
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Worker threads per phase
    pub workers: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Results of one phase
#[derive(Debug)]
pub struct PhaseReport {
    pub phase: Phase,
    pub results: Vec<JobResult>,
}

/// Outcome of an apply run
#[derive(Debug)]
pub struct ApplyReport {
    /// Identifies the run in logs
    pub run_id: Uuid,
    pub profile: String,
    pub scope: Scope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Phases that had work, in execution order
    pub phases: Vec<PhaseReport>,
}

impl ApplyReport {
    /// Every job result, in phase order
    pub fn results(&self) -> impl Iterator<Item = &JobResult> {
        self.phases.iter().flat_map(|p| p.results.iter())
    }

    /// Failed jobs
    pub fn failures(&self) -> Vec<&JobResult> {
        self.results().filter(|r| !r.is_success()).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.results().filter(|r| r.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.results().count()
    }

    /// Whether every job succeeded
    pub fn is_success(&self) -> bool {
        self.results().all(JobResult::is_success)
    }
}

/// Apply a diff through `runner`
///
/// Job failures never stop the run; they are collected in the report.
pub fn apply_diff(
    diff: &DiffResult,
    runner: &dyn CommandRunner,
    options: ApplyOptions,
    progress: &mut dyn ProgressSink,
) -> ApplyReport {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("apply", %run_id, profile = %diff.profile, scope = %diff.scope);
    let _guard = span.enter();

    let started_at = Utc::now();
    let mut phases = Vec::new();

    for phase in Phase::ALL {
        let jobs = phase_jobs(phase, diff, runner);
        if jobs.is_empty() {
            continue;
        }

        tracing::info!(%phase, jobs = jobs.len(), "starting phase");
        progress.phase_started(phase, jobs.len());
        let results = run_jobs(jobs, options.workers, |result| {
            progress.item_finished(&ProgressEvent::from_result(phase, result));
        });

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            tracing::warn!(%phase, failed, "phase finished with failures");
        }
        progress.phase_finished(phase, failed);
        phases.push(PhaseReport { phase, results });
    }

    let report = ApplyReport {
        run_id,
        profile: diff.profile.clone(),
        scope: diff.scope,
        started_at,
        finished_at: Utc::now(),
        phases,
    };
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.total() - report.succeeded(),
        "apply finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::McpServer;
    use stackctl_scanner::{Marketplace, RegisteredMarketplace};
    use std::sync::Mutex;

    /// Records commands and fails those containing a marker
    #[derive(Default)]
    struct FakeRunner {
        calls: Mutex<Vec<Vec<String>>>,
        fail_with: Vec<(&'static str, &'static str)>,
    }

    impl CommandRunner for FakeRunner {
        fn run_with_output(&self, args: &[String]) -> Result<String, CommandError> {
            self.calls.lock().unwrap().push(args.to_vec());
            let line = args.join(" ");
            for (marker, output) in &self.fail_with {
                if line.contains(marker) {
                    return Err(CommandError::Failed {
                        command: line.clone(),
                        output: (*output).to_string(),
                    });
                }
            }
            Ok(String::new())
        }
    }

    fn diff() -> DiffResult {
        let mut diff = DiffResult::new("web", Scope::Project);
        diff.plugins_to_remove = vec!["old@web".into()];
        diff.mcp_to_remove = vec!["stale".into()];
        diff.marketplaces_to_remove = vec![RegisteredMarketplace {
            name: "legacy".into(),
            marketplace: Marketplace::github("acme/legacy"),
        }];
        diff.marketplaces_to_add = vec![Marketplace::github("acme/web")];
        diff.plugins_to_install = vec!["lint@web".into(), "fmt@web".into()];
        diff.mcp_to_install = vec![McpServer::new("db", "db-mcp", vec![])];
        diff
    }

    fn phase_of(calls: &[Vec<String>], needle: &str) -> usize {
        calls
            .iter()
            .position(|c| c.join(" ").contains(needle))
            .unwrap_or_else(|| panic!("no call containing {needle}"))
    }

    #[test]
    fn test_phases_run_in_order() {
        let runner = FakeRunner::default();
        let mut progress = RecordingProgress::default();
        let report = apply_diff(&diff(), &runner, ApplyOptions { workers: 4 }, &mut progress);

        assert!(report.is_success());
        assert_eq!(report.total(), 7);
        assert_eq!(
            progress.phases,
            vec![(Phase::Remove, 2), (Phase::Marketplaces, 2), (Phase::Install, 3)]
        );

        let calls = runner.calls.lock().unwrap();
        let last_removal = phase_of(&calls, "uninstall").max(phase_of(&calls, "mcp remove"));
        let first_marketplace = phase_of(&calls, "marketplace remove").min(phase_of(&calls, "marketplace add"));
        let last_marketplace = phase_of(&calls, "marketplace remove").max(phase_of(&calls, "marketplace add"));
        let first_install = phase_of(&calls, "plugin install").min(phase_of(&calls, "mcp add"));
        assert!(last_removal < first_marketplace);
        assert!(last_marketplace < first_install);
    }

    #[test]
    fn test_not_found_on_removal_is_success() {
        let runner = FakeRunner {
            fail_with: vec![("uninstall", "Plugin old not installed"), ("marketplace remove", "Marketplace does not exist")],
            ..FakeRunner::default()
        };
        let report = apply_diff(&diff(), &runner, ApplyOptions::default(), &mut NoProgress);
        assert!(report.is_success());
    }

    #[test]
    fn test_not_found_on_install_is_a_failure() {
        let runner = FakeRunner {
            fail_with: vec![("install --scope=project lint@web", "Plugin lint not found")],
            ..FakeRunner::default()
        };
        let mut progress = RecordingProgress::default();
        let report = apply_diff(&diff(), &runner, ApplyOptions::default(), &mut progress);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "lint@web");
        assert_eq!(failures[0].kind, JobKind::Plugin);
        assert_eq!(report.succeeded(), 6);

        let failed_event = progress.events.iter().find(|e| !e.success).unwrap();
        assert_eq!(failed_event.phase, Phase::Install);
        assert!(failed_event.error.as_deref().unwrap().contains("not found"));
    }

    #[test]
    fn test_empty_diff_runs_nothing() {
        let runner = FakeRunner::default();
        let report = apply_diff(
            &DiffResult::new("none", Scope::User),
            &runner,
            ApplyOptions::default(),
            &mut NoProgress,
        );
        assert!(report.phases.is_empty());
        assert!(report.is_success());
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
