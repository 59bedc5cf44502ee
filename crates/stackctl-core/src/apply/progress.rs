//! Progress reporting
//!
//! The apply loop emits structured events; rendering is up to the sink.

use super::executor::{JobKind, JobResult};
use serde::Serialize;
use std::fmt;

/// Apply phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Plugin uninstalls and MCP server removals
    Remove,
    /// Marketplace removals and registrations
    Marketplaces,
    /// Plugin installs and MCP server additions
    Install,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Remove, Phase::Marketplaces, Phase::Install];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Remove => "remove",
            Self::Marketplaces => "marketplaces",
            Self::Install => "install",
        };
        f.write_str(s)
    }
}

/// One finished job
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub name: String,
    pub kind: JobKind,
    pub success: bool,
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn from_result(phase: Phase, result: &JobResult) -> Self {
        Self {
            phase,
            name: result.name.clone(),
            kind: result.kind,
            success: result.is_success(),
            error: result.error().map(ToString::to_string),
        }
    }
}

/// Receiver of apply progress
pub trait ProgressSink {
    /// A phase with `total` jobs is starting
    fn phase_started(&mut self, phase: Phase, total: usize);

    /// A job finished
    fn item_finished(&mut self, event: &ProgressEvent);

    /// Every job of the phase finished
    fn phase_finished(&mut self, phase: Phase, failed: usize) {
        let _ = (phase, failed);
    }
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn phase_started(&mut self, _phase: Phase, _total: usize) {}

    fn item_finished(&mut self, _event: &ProgressEvent) {}
}

/// Records every event, for tests and reports
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub phases: Vec<(Phase, usize)>,
    pub events: Vec<ProgressEvent>,
}

impl ProgressSink for RecordingProgress {
    fn phase_started(&mut self, phase: Phase, total: usize) {
        self.phases.push((phase, total));
    }

    fn item_finished(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}
