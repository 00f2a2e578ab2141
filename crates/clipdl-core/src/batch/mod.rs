//! Batch orchestration: prepare the output directory, then run jobs with
//! bounded parallelism and aggregate their outcomes.
//!
//! Keeps up to `workers` jobs running at once; when one finishes, the next job
//! in input order is dispatched until the list is exhausted or the cancel
//! token is raised. Jobs run on tokio's blocking pool because resolvers and
//! fetchers do blocking network I/O.

mod outcome;

pub use outcome::{
    BatchPhase, BatchReport, BatchResult, BatchStatus, BatchSummary, JobFailure, JobOutcome,
};

use std::collections::{BTreeMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use crate::control::CancelToken;
use crate::error::SetupError;
use crate::fetcher::AssetFetcher;
use crate::job::Job;
use crate::resolver::PageResolver;
use crate::runner::JobRunner;
use crate::sequencer::FilenameSequencer;
use crate::sink::{BatchEvent, LogSink};

pub const DEFAULT_WORKERS: usize = 5;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum jobs in flight (clamped to at least 1).
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

pub struct BatchOrchestrator {
    resolver: Arc<dyn PageResolver>,
    fetcher: Arc<dyn AssetFetcher>,
    sink: Arc<dyn LogSink>,
    options: BatchOptions,
    cancel: CancelToken,
}

impl BatchOrchestrator {
    pub fn new(
        resolver: Arc<dyn PageResolver>,
        fetcher: Arc<dyn AssetFetcher>,
        sink: Arc<dyn LogSink>,
        options: BatchOptions,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            sink,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned token (e.g. one flipped by a Ctrl-C handler).
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the whole batch. Only setup problems are errors; individual job
    /// failures end up in the report.
    pub async fn run(&self, jobs: Vec<Job>, output_dir: &Path) -> Result<BatchReport, SetupError> {
        self.sink.record(BatchEvent::Phase(BatchPhase::Idle));
        tracing::info!(
            jobs = jobs.len(),
            workers = self.options.workers,
            "starting download of {} clip(s) to {}",
            jobs.len(),
            output_dir.display()
        );

        let sequencer = self.prepare(output_dir).await?;
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.fetcher),
            sequencer,
            Arc::clone(&self.sink),
            output_dir.to_path_buf(),
        ));

        self.sink.record(BatchEvent::Phase(BatchPhase::Running));
        let (results, skipped) = self.dispatch(runner, jobs).await;

        let status = if self.cancel.is_cancelled() {
            BatchStatus::Cancelled
        } else {
            BatchStatus::Completed
        };
        let report = BatchReport {
            status,
            results,
            skipped,
        };
        self.sink.record(BatchEvent::Phase(status.into()));
        self.sink.record(BatchEvent::Summary(report.summary()));
        Ok(report)
    }

    /// Creates the output directory if needed and seeds the sequencer from it.
    async fn prepare(&self, output_dir: &Path) -> Result<Arc<FilenameSequencer>, SetupError> {
        self.sink.record(BatchEvent::Phase(BatchPhase::Preparing));

        if output_dir.exists() && !output_dir.is_dir() {
            return Err(SetupError::NotADirectory {
                path: output_dir.to_path_buf(),
            });
        }
        if !output_dir.exists() {
            tokio::fs::create_dir_all(output_dir)
                .await
                .map_err(|source| SetupError::OutputDir {
                    path: output_dir.to_path_buf(),
                    source,
                })?;
            tracing::info!("created output directory: {}", output_dir.display());
        }

        Ok(Arc::new(FilenameSequencer::from_dir(output_dir)))
    }

    async fn dispatch(
        &self,
        runner: Arc<JobRunner>,
        jobs: Vec<Job>,
    ) -> (Vec<BatchResult>, Vec<Job>) {
        let workers = self.options.workers.max(1);
        let mut queue: VecDeque<(usize, Job)> = jobs.into_iter().enumerate().collect();
        let mut in_flight: BTreeMap<usize, Job> = BTreeMap::new();
        let mut results: Vec<BatchResult> = Vec::with_capacity(queue.len());
        let mut join_set = tokio::task::JoinSet::new();
        let mut cancel_reported = false;

        loop {
            while join_set.len() < workers && !queue.is_empty() {
                if self.cancel.is_cancelled() {
                    break;
                }
                let Some((index, job)) = queue.pop_front() else {
                    break;
                };
                let runner = Arc::clone(&runner);
                let task_job = job.clone();
                in_flight.insert(index, job);
                join_set.spawn_blocking(move || {
                    let outcome = catch_unwind(AssertUnwindSafe(|| runner.run(index, &task_job)))
                        .unwrap_or_else(|payload| {
                            let message = panic_message(payload.as_ref());
                            JobOutcome::Failure(JobFailure::Panicked(message))
                        });
                    (index, outcome)
                });
            }

            if self.cancel.is_cancelled() && !cancel_reported {
                cancel_reported = true;
                self.sink.record(BatchEvent::Cancelled {
                    skipped: queue.len(),
                });
            }

            if join_set.is_empty() {
                break;
            }
            let Some(joined) = join_set.join_next().await else {
                break;
            };
            match joined {
                Ok((index, outcome)) => {
                    let Some(job) = in_flight.remove(&index) else {
                        continue;
                    };
                    if let JobOutcome::Failure(failure @ JobFailure::Panicked(_)) = &outcome {
                        self.sink.record(BatchEvent::JobFailed {
                            index,
                            label: job.label(),
                            reason: failure.to_string(),
                        });
                    }
                    results.push(BatchResult { index, job, outcome });
                }
                Err(e) => tracing::error!("job task join: {}", e),
            }
        }

        // Only reachable if a task was lost without reporting (runtime shutdown).
        for (index, job) in std::mem::take(&mut in_flight) {
            let failure = JobFailure::Panicked("worker task lost".to_string());
            self.sink.record(BatchEvent::JobFailed {
                index,
                label: job.label(),
                reason: failure.to_string(),
            });
            results.push(BatchResult {
                index,
                job,
                outcome: JobOutcome::Failure(failure),
            });
        }

        results.sort_by_key(|r| r.index);
        let skipped = queue.into_iter().map(|(_, job)| job).collect();
        (results, skipped)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
