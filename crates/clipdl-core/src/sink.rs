//! Logging sink injected into the orchestrator and job runner.
//!
//! The core never logs job lifecycle through a global logger; it reports
//! [`BatchEvent`]s to whatever sink the caller passes in.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::batch::{BatchPhase, BatchSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// One reportable event of a batch run. Job events carry the job's input
/// index and display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Phase(BatchPhase),
    JobStarted { index: usize, label: String },
    JobResolved { index: usize, label: String, media_url: String },
    JobFetched { index: usize, label: String, path: PathBuf, bytes: u64 },
    JobFailed { index: usize, label: String, reason: String },
    /// Cancellation observed; `skipped` jobs will not be dispatched.
    Cancelled { skipped: usize },
    Summary(BatchSummary),
}

impl BatchEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            BatchEvent::JobFailed { .. } => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

pub trait LogSink: Send + Sync {
    fn record(&self, event: BatchEvent);
}

/// Forwards events to `tracing` (which the binary routes to file and stderr).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, event: BatchEvent) {
        match event {
            BatchEvent::Phase(phase) => tracing::debug!(?phase, "batch phase"),
            BatchEvent::JobStarted { index, label } => {
                tracing::info!(job = index + 1, "started: {}", label)
            }
            BatchEvent::JobResolved { index, label, media_url } => {
                tracing::info!(job = index + 1, media_url = %media_url, "resolved: {}", label)
            }
            BatchEvent::JobFetched { index, label, path, bytes } => tracing::info!(
                job = index + 1,
                bytes,
                path = %path.display(),
                "fetch complete: {}",
                label
            ),
            BatchEvent::JobFailed { index, label, reason } => {
                tracing::error!(job = index + 1, "failed: {}: {}", label, reason)
            }
            BatchEvent::Cancelled { skipped } => {
                tracing::info!(skipped, "batch cancelled; no further jobs will start")
            }
            BatchEvent::Summary(s) => tracing::info!(
                succeeded = s.succeeded,
                failed = s.failed,
                skipped = s.skipped,
                "batch finished"
            ),
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<BatchEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn errors(&self) -> Vec<BatchEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level() == LogLevel::Error)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn record(&self, event: BatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
