//! Jobs for each apply phase

use super::command::{
    marketplace_add_args, marketplace_remove_args, mcp_add_args, mcp_remove_args,
    plugin_install_args, plugin_uninstall_args, CommandRunner,
};
use super::executor::{Job, JobError, JobKind};
use super::progress::Phase;
use crate::diff::DiffResult;

/// Build the jobs of one phase
///
/// Removal jobs treat a "not found" answer from the host as success: the
/// item is already gone, which is what the job wanted.
pub fn phase_jobs<'a>(
    phase: Phase,
    diff: &'a DiffResult,
    runner: &'a dyn CommandRunner,
) -> Vec<Job<'a>> {
    let scope = diff.scope;
    let mut jobs = Vec::new();

    match phase {
        Phase::Remove => {
            for plugin in &diff.plugins_to_remove {
                let args = plugin_uninstall_args(plugin, scope);
                jobs.push(Job::new(plugin.clone(), JobKind::Plugin, move || {
                    run_removal(runner, &args)
                }));
            }
            for name in &diff.mcp_to_remove {
                let args = mcp_remove_args(name, scope);
                jobs.push(Job::new(name.clone(), JobKind::Mcp, move || {
                    run_removal(runner, &args)
                }));
            }
        }
        Phase::Marketplaces => {
            for registered in &diff.marketplaces_to_remove {
                let args = marketplace_remove_args(&registered.name);
                jobs.push(Job::new(registered.name.clone(), JobKind::Marketplace, move || {
                    run_removal(runner, &args)
                }));
            }
            for marketplace in &diff.marketplaces_to_add {
                let args = marketplace_add_args(marketplace);
                jobs.push(Job::new(marketplace.key(), JobKind::Marketplace, move || {
                    run(runner, &args)
                }));
            }
        }
        Phase::Install => {
            for plugin in &diff.plugins_to_install {
                let args = plugin_install_args(plugin, scope);
                jobs.push(Job::new(plugin.clone(), JobKind::Plugin, move || {
                    run(runner, &args)
                }));
            }
            for server in &diff.mcp_to_install {
                let args = mcp_add_args(&server.name, &server.command, &server.args, scope);
                jobs.push(Job::new(server.name.clone(), JobKind::Mcp, move || {
                    run(runner, &args)
                }));
            }
        }
    }
    jobs
}

fn run(runner: &dyn CommandRunner, args: &[String]) -> Result<(), JobError> {
    runner.run(args).map_err(JobError::from)
}

fn run_removal(runner: &dyn CommandRunner, args: &[String]) -> Result<(), JobError> {
    match runner.run(args) {
        Err(e) if e.is_not_found() => {
            tracing::debug!(?args, "target already absent");
            Ok(())
        }
        other => other.map_err(JobError::from),
    }
}
