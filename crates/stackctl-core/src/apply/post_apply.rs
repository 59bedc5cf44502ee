//! Post-apply hook

use crate::profile::{PostApply, PostApplyCondition};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Errors from running the post-apply hook
#[derive(Debug, Error)]
pub enum PostApplyError {
    #[error("postApply defines neither a command nor a script")]
    Empty,

    #[error("Failed to start post-apply hook {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Post-apply hook exited with {status}: {output}")]
    Failed { status: String, output: String },
}

/// Whether the hook should run after an apply
///
/// Nothing runs after a failed apply. `force` overrides the condition.
#[must_use]
pub fn should_run_post_apply(
    post_apply: &PostApply,
    apply_succeeded: bool,
    first_run: bool,
    force: bool,
) -> bool {
    if !apply_succeeded {
        return false;
    }
    force
        || match post_apply.condition {
            PostApplyCondition::Always => true,
            PostApplyCondition::FirstRun => first_run,
        }
}

/// Run the hook from `working_dir` and return its standard output
///
/// A command runs with `sh -c`. A script runs directly; a relative script
/// path is resolved against `profile_dir`. When both are set the command
/// wins.
///
/// # Errors
/// Returns an error if there is nothing to run, the hook cannot start or it
/// exits unsuccessfully
pub fn run_post_apply(
    post_apply: &PostApply,
    profile_dir: Option<&Path>,
    working_dir: &Path,
) -> Result<String, PostApplyError> {
    let (program, mut cmd) = match (&post_apply.command, &post_apply.script) {
        (Some(command), _) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            (command.clone(), cmd)
        }
        (None, Some(script)) => {
            let path = script_path(script, profile_dir);
            (path.display().to_string(), Command::new(&path))
        }
        (None, None) => return Err(PostApplyError::Empty),
    };
    cmd.current_dir(working_dir);

    tracing::info!(hook = %program, "running post-apply hook");
    let output = cmd.output().map_err(|source| PostApplyError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
        Err(PostApplyError::Failed {
            status: output.status.to_string(),
            output: text.to_string(),
        })
    }
}

fn script_path(script: &str, profile_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(script);
    match profile_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}
