//! Batch-level errors that stop a run before any job is dispatched.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal setup failure: the batch never reaches the running phase.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output path {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("cannot read input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
