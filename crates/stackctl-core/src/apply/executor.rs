//! Bounded worker pool for apply jobs
//!
//! Every job of a batch is queued up front into a channel sized to the batch,
//! so submission never blocks. A fixed set of scoped worker threads pulls
//! from that queue and sends results back; the caller sees results in
//! completion order and the call returns once every worker has drained the
//! queue. Phases are sequenced by calling [`run_jobs`] once per phase.

use super::command::CommandError;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use thiserror::Error;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 4;

/// What a job touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Marketplace,
    Plugin,
    Mcp,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Marketplace => "marketplace",
            Self::Plugin => "plugin",
            Self::Mcp => "mcp",
        };
        f.write_str(s)
    }
}

/// Errors from a single job
#[derive(Debug, Error)]
pub enum JobError {
    /// The host command failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The job panicked
    #[error("job panicked: {0}")]
    Panicked(String),
}

type Action<'a> = Box<dyn FnOnce() -> Result<(), JobError> + Send + 'a>;

/// A unit of work: a name, a kind and an action
///
/// The executor only sees the action's outcome, never what it does.
pub struct Job<'a> {
    name: String,
    kind: JobKind,
    action: Action<'a>,
}

impl<'a> Job<'a> {
    pub fn new(
        name: impl Into<String>,
        kind: JobKind,
        action: impl FnOnce() -> Result<(), JobError> + Send + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    fn run(self) -> JobResult {
        let Self { name, kind, action } = self;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
        };
        JobResult { name, kind, outcome }
    }
}

impl fmt::Debug for Job<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome of one job
///
/// Carries the job's name and kind, never the job itself.
#[derive(Debug)]
pub struct JobResult {
    pub name: String,
    pub kind: JobKind,
    pub outcome: Result<(), JobError>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }
}

/// Run a batch of jobs on `workers` threads
///
/// `on_result` is called on the calling thread as each result arrives. A
/// failing or panicking job never stops its siblings; failures are returned
/// as data.
pub fn run_jobs<'a>(
    jobs: Vec<Job<'a>>,
    workers: usize,
    mut on_result: impl FnMut(&JobResult),
) -> Vec<JobResult> {
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);

    let (job_tx, job_rx) = mpsc::sync_channel::<Job<'a>>(total);
    for job in jobs {
        // Capacity equals the batch size and the receiver is alive
        if job_tx.send(job).is_err() {
            break;
        }
    }
    drop(job_tx);

    let job_rx = Mutex::new(job_rx);
    let (result_tx, result_rx) = mpsc::channel();
    tracing::debug!(jobs = total, workers, "starting worker pool");

    thread::scope(|scope| {
        for id in 0..workers {
            let result_tx = result_tx.clone();
            let job_rx = &job_rx;
            scope.spawn(move || worker(id, job_rx, &result_tx));
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        for result in result_rx {
            on_result(&result);
            results.push(result);
        }
        results
    })
}

fn worker(id: usize, jobs: &Mutex<Receiver<Job<'_>>>, results: &Sender<JobResult>) {
    loop {
        let next = jobs.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(job) = next else {
            break;
        };

        tracing::trace!(worker = id, job = job.name(), kind = %job.kind(), "running job");
        if results.send(job.run()).is_err() {
            break;
        }
    }
}
