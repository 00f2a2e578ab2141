//! Per-job outcomes and the aggregated batch report.

use std::path::PathBuf;
use thiserror::Error;

use crate::job::Job;

/// Why a single job failed. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Another job in the same batch already claimed this output path.
    #[error("destination already used by another job: {0}")]
    DuplicateDestination(String),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success { path: PathBuf, bytes: u64 },
    Failure(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

/// Outcome of one job, tagged with its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub index: usize,
    pub job: Job,
    pub outcome: JobOutcome,
}

/// Lifecycle of one batch run: `Idle → Preparing → Running → Completed | Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Preparing,
    Running,
    Completed,
    Cancelled,
}

/// Terminal state of a run that got past setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Cancelled,
}

impl From<BatchStatus> for BatchPhase {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => BatchPhase::Completed,
            BatchStatus::Cancelled => BatchPhase::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Never dispatched because of cancellation.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub status: BatchStatus,
    /// One entry per dispatched job, sorted by input index.
    pub results: Vec<BatchResult>,
    /// Jobs not dispatched because the run was cancelled, in input order.
    pub skipped: Vec<Job>,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.results.iter().filter(|r| r.outcome.is_success()).count();
        BatchSummary {
            succeeded,
            failed: self.results.len() - succeeded,
            skipped: self.skipped.len(),
        }
    }

    /// Failed results, so the caller can offer a retry of just those jobs.
    pub fn failed(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }
}
