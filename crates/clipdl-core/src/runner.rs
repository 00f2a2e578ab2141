//! Runs one job: name the output, resolve the page, fetch the media.
//!
//! Every failure is turned into a [`JobOutcome::Failure`] here; nothing a
//! single job does can abort its siblings.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::batch::{JobFailure, JobOutcome};
use crate::fetcher::AssetFetcher;
use crate::job::Job;
use crate::naming::{media_file_name, player_base_name, sanitize_filename};
use crate::resolver::PageResolver;
use crate::sequencer::FilenameSequencer;
use crate::sink::{BatchEvent, LogSink};

pub struct JobRunner {
    resolver: Arc<dyn PageResolver>,
    fetcher: Arc<dyn AssetFetcher>,
    sequencer: Arc<FilenameSequencer>,
    sink: Arc<dyn LogSink>,
    output_dir: PathBuf,
    /// Destinations claimed by jobs of this batch; never released during the run.
    claimed: Mutex<HashSet<PathBuf>>,
}

/// Base name fixed by the job itself: `order@player`, else the sanitized
/// name, else the bare `order`. `None` means the sequencer picks one.
fn explicit_base_name(job: &Job) -> Option<String> {
    if let (Some(order), Some(player)) = (job.order(), job.player()) {
        let base = player_base_name(order, player);
        if !base.is_empty() {
            return Some(base);
        }
    }
    if let Some(name) = job.name() {
        let base = sanitize_filename(name);
        if !base.is_empty() {
            return Some(base);
        }
    }
    job.order().map(|order| order.to_string())
}

impl JobRunner {
    pub fn new(
        resolver: Arc<dyn PageResolver>,
        fetcher: Arc<dyn AssetFetcher>,
        sequencer: Arc<FilenameSequencer>,
        sink: Arc<dyn LogSink>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            sequencer,
            sink,
            output_dir,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Output base name (without extension). The sequencer is consulted only
    /// for jobs with no usable name and no `order`.
    pub fn base_name(&self, job: &Job) -> String {
        explicit_base_name(job).unwrap_or_else(|| self.sequencer.next_value().to_string())
    }

    /// Reserves the job's output path for the rest of the batch. A sequencer
    /// value already claimed by an explicitly named job is skipped.
    fn claim_destination(&self, job: &Job) -> Result<PathBuf, JobFailure> {
        let explicit = explicit_base_name(job).is_some();
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let mut base = self.base_name(job);
        loop {
            let path = self.output_dir.join(media_file_name(&base));
            if claimed.insert(path.clone()) {
                return Ok(path);
            }
            if explicit {
                return Err(JobFailure::DuplicateDestination(path.display().to_string()));
            }
            base = self.sequencer.next_value().to_string();
        }
    }

    /// Runs `job` (at input position `index`) to a terminal outcome.
    pub fn run(&self, index: usize, job: &Job) -> JobOutcome {
        let label = job.label();
        self.sink.record(BatchEvent::JobStarted {
            index,
            label: label.clone(),
        });

        let destination = match self.claim_destination(job) {
            Ok(path) => path,
            Err(failure) => return self.fail(index, label, failure),
        };

        let media_url = match self.resolver.resolve(job.source_url()) {
            Ok(url) => url,
            Err(e) => {
                return self.fail(index, label, JobFailure::ResolutionFailed(e.to_string()));
            }
        };
        self.sink.record(BatchEvent::JobResolved {
            index,
            label: label.clone(),
            media_url: media_url.clone(),
        });

        match self.fetcher.fetch(&media_url, &destination) {
            Ok(bytes) => {
                self.sink.record(BatchEvent::JobFetched {
                    index,
                    label,
                    path: destination.clone(),
                    bytes,
                });
                JobOutcome::Success {
                    path: destination,
                    bytes,
                }
            }
            Err(e) => self.fail(index, label, JobFailure::FetchFailed(e.to_string())),
        }
    }

    fn fail(&self, index: usize, label: String, failure: JobFailure) -> JobOutcome {
        self.sink.record(BatchEvent::JobFailed {
            index,
            label,
            reason: failure.to_string(),
        });
        JobOutcome::Failure(failure)
    }
}
