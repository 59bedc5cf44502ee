//! Reconciliation CLI commands
//!
//! Handles: stackctl diff/apply/reset

use anyhow::{bail, Context as _, Result};
use clap::Args;
use std::io;

use stackctl_core::apply::{
    apply_diff, run_post_apply, should_run_post_apply, ApplyOptions, ApplyReport,
};
use stackctl_core::diff::{
    compute_diff, format_diff_terminal, is_first_run, plan_reset, DiffResult, DiffSummary,
};
use stackctl_scanner::Scope;

use crate::context::{target_scopes, Context};
use crate::progress::TerminalProgress;

/// Arguments for `stackctl apply`
#[derive(Args)]
pub struct ApplyArgs {
    /// Profile name or path to a profile file
    pub profile: String,

    /// Scope to reconcile (defaults to the scopes the profile declares)
    #[arg(long)]
    pub scope: Option<Scope>,

    /// Preview changes without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Worker threads per phase
    #[arg(long)]
    pub workers: Option<usize>,

    /// Run the post-apply hook regardless of its condition
    #[arg(long)]
    pub force_post_apply: bool,
}

/// Show the actions applying a profile would take
pub fn diff(ctx: &Context, reference: &str, scope: Option<Scope>, json: bool) -> Result<()> {
    let profile = ctx.resolve(reference)?;
    let state = ctx.observe()?;

    let diffs: Vec<DiffResult> = target_scopes(&profile, scope)
        .into_iter()
        .map(|scope| compute_diff(&profile, &state, scope))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }
    for diff in &diffs {
        print_diff(diff);
    }
    Ok(())
}

fn print_diff(diff: &DiffResult) {
    print!("{}", format_diff_terminal(diff));
    println!("Summary: {}\n", DiffSummary::from_diff(diff).one_line());
}

/// Apply a profile
pub fn apply(ctx: &mut Context, args: &ApplyArgs) -> Result<()> {
    let workers = args.workers.unwrap_or(ctx.config.workers);
    if workers == 0 {
        bail!("--workers must be at least 1");
    }
    let options = ApplyOptions { workers };

    let profile = ctx.resolve(&args.profile)?;
    let scopes = target_scopes(&profile, args.scope);
    let mut state = ctx.observe()?;
    let first_run = is_first_run(&profile.marketplaces, &state);

    let runner = ctx.runner();
    let mut reports = Vec::new();
    for (i, &scope) in scopes.iter().enumerate() {
        // Earlier scopes may have registered marketplaces
        if i > 0 && !args.dry_run {
            state = ctx.observe()?;
        }
        let diff = compute_diff(&profile, &state, scope);
        print_diff(&diff);
        if args.dry_run {
            continue;
        }
        let mut progress = TerminalProgress::new(io::stdout());
        reports.push(apply_diff(&diff, &runner, options, &mut progress));
    }

    if args.dry_run {
        println!("Dry run - no changes made.");
        return Ok(());
    }
    check_reports(&reports)?;

    for &scope in &scopes {
        ctx.config.record_applied(scope, &ctx.project, &profile.name);
    }
    ctx.save_config()?;
    println!("Applied profile '{}'.", profile.name);

    if let Some(post_apply) = &profile.post_apply {
        if should_run_post_apply(post_apply, true, first_run, args.force_post_apply) {
            let profile_dir = ctx.profile_dir(&args.profile);
            let output = run_post_apply(post_apply, profile_dir.as_deref(), &ctx.project)
                .context("Post-apply hook failed")?;
            if !output.trim().is_empty() {
                println!("{}", output.trim_end());
            }
        } else {
            tracing::info!(profile = %profile.name, "post-apply hook skipped, not a first run");
        }
    }
    Ok(())
}

/// Remove what a profile declares
pub fn reset(ctx: &mut Context, reference: &str, scope: Option<Scope>, dry_run: bool) -> Result<()> {
    let profile = ctx.resolve(reference)?;
    let scopes = target_scopes(&profile, scope);

    let runner = ctx.runner();
    let options = ApplyOptions {
        workers: ctx.config.workers,
    };
    let mut reports = Vec::new();
    for &scope in &scopes {
        let state = ctx.observe()?;
        let diff = plan_reset(&profile, &state, scope);
        print_diff(&diff);
        if !dry_run {
            let mut progress = TerminalProgress::new(io::stdout());
            reports.push(apply_diff(&diff, &runner, options, &mut progress));
        }
    }

    if dry_run {
        println!("Dry run - no changes made.");
        return Ok(());
    }
    check_reports(&reports)?;

    for &scope in &scopes {
        let applied = ctx.config.applied_for(scope, &ctx.project);
        if applied.is_some_and(|a| a.profile == profile.name) {
            ctx.config.clear_applied(scope, &ctx.project);
        }
    }
    ctx.save_config()?;
    println!("Reset profile '{}'.", profile.name);
    Ok(())
}

/// Print every failed job and fail if there were any
fn check_reports(reports: &[ApplyReport]) -> Result<()> {
    let total: usize = reports.iter().map(ApplyReport::total).sum();
    let failures: Vec<_> = reports
        .iter()
        .flat_map(|r| r.failures().into_iter().map(move |f| (r.scope, f)))
        .collect();

    if failures.is_empty() {
        return Ok(());
    }

    eprintln!("\nFailed:");
    for (scope, failure) in &failures {
        let error = failure
            .error()
            .map(ToString::to_string)
            .unwrap_or_default();
        eprintln!("  [{scope}] {} {}: {error}", failure.kind, failure.name);
    }
    bail!("{} of {total} job(s) failed", failures.len())
}
