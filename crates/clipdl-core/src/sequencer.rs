//! Shared ordinal filename counter for one batch run.
//!
//! Seeded once at batch start from the highest numbered `.mp4` already in the
//! output directory. The scan is best-effort: files added to the directory by
//! another process during a run are not seen.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::naming::{leading_number, MEDIA_EXTENSION};

/// Highest leading number among `.mp4` files in `dir`; 0 if none or if the
/// directory does not exist or cannot be read.
pub fn peek_max(dir: &Path) -> u64 {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "sequencer scan skipped");
            return 0;
        }
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let is_media = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(MEDIA_EXTENSION))
                .unwrap_or(false);
            if !is_media {
                return None;
            }
            let name = path.file_name()?.to_str()?;
            leading_number(name)
        })
        .max()
        .unwrap_or(0)
}

/// Thread-safe counter. Every call to [`next_value`](Self::next_value)
/// returns a distinct value, strictly increasing in call order.
#[derive(Debug)]
pub struct FilenameSequencer {
    next: AtomicU64,
}

impl FilenameSequencer {
    /// Counter whose first value is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Counter seeded from `dir`: first value is `peek_max(dir) + 1`.
    pub fn from_dir(dir: &Path) -> Self {
        let max = peek_max(dir);
        tracing::debug!(dir = %dir.display(), max, "sequencer seeded");
        Self::starting_at(max + 1)
    }

    pub fn next_value(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Value the next call would return (diagnostics only; racy under concurrency).
    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
