//! Media download: stream a URL to disk via a `.part` temp file.
//!
//! The body goes to `<destination>.part` chunk by chunk as libcurl delivers
//! it, and is moved to the destination only after a 2xx response and a
//! successful sync. On any failure the temp file is deleted, so a file at the
//! destination path is always complete. The temp file is created exclusively:
//! a `.part` that already exists belongs to someone else and is left alone.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Temporary file suffix used before the final rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `1.mp4` → `1.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(#[from] curl::Error),

    #[error("HTTP {0}")]
    Http(u32),

    #[error("storage: {0}")]
    Io(#[from] io::Error),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Another download (or an interrupted run) owns the temp file.
    #[error("temporary file already exists: {}", .0.display())]
    PartialExists(PathBuf),

    /// Server closed early (fewer bytes than Content-Length).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
}

/// Streams a media URL to a local file. Returns the number of bytes written.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, media_url: &str, destination: &Path) -> Result<u64, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Abort when the transfer stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard cap on a single transfer.
    pub timeout: Duration,
    /// libcurl receive buffer; bounds the size of each chunk written.
    pub buffer_size: usize,
    /// Replace an existing destination file instead of failing.
    pub overwrite: bool,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            buffer_size: 8 * 1024,
            overwrite: false,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    settings: FetchSettings,
}

impl CurlFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn download_to(&self, url: &str, mut file: File) -> Result<u64, FetchError> {
        let mut written: u64 = 0;
        let mut write_err: Option<io::Error> = None;

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.buffer_size(self.settings.buffer_size)?;
        easy.connect_timeout(self.settings.connect_timeout)?;
        easy.low_speed_limit(self.settings.low_speed_limit)?;
        easy.low_speed_time(self.settings.low_speed_time)?;
        easy.timeout(self.settings.timeout)?;
        if let Some(ua) = &self.settings.user_agent {
            easy.useragent(ua)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_err = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            let performed = transfer.perform();
            drop(transfer);
            if let Some(e) = write_err {
                return Err(FetchError::Io(e));
            }
            performed?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }

        // libcurl reports -1 when the length is unknown.
        let expected = easy.content_length_download()?;
        if expected >= 0.0 && (expected as u64) != written {
            return Err(FetchError::PartialTransfer {
                expected: expected as u64,
                received: written,
            });
        }

        file.sync_all()?;
        Ok(written)
    }
}

impl AssetFetcher for CurlFetcher {
    fn fetch(&self, media_url: &str, destination: &Path) -> Result<u64, FetchError> {
        if !self.settings.overwrite && destination.exists() {
            return Err(FetchError::DestinationExists(destination.to_path_buf()));
        }

        let part_path = temp_path(destination);
        let file = match OpenOptions::new().write(true).create_new(true).open(&part_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FetchError::PartialExists(part_path));
            }
            Err(e) => return Err(FetchError::Io(e)),
        };

        let result = self.download_to(media_url, file).and_then(|bytes| {
            publish(&part_path, destination, self.settings.overwrite)?;
            Ok(bytes)
        });

        if result.is_err() {
            remove_partial(&part_path);
        }
        result
    }
}

/// Moves a finished temp file into place. Without `overwrite` an existing
/// destination is never replaced, even one that appeared mid-download.
fn publish(part_path: &Path, destination: &Path, overwrite: bool) -> Result<(), FetchError> {
    if overwrite {
        fs::rename(part_path, destination)?;
        return Ok(());
    }
    match fs::hard_link(part_path, destination) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(part_path) {
                tracing::warn!(
                    path = %part_path.display(),
                    error = %e,
                    "could not remove temp file"
                );
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(FetchError::DestinationExists(destination.to_path_buf()))
        }
        Err(e) => {
            // No hard links on this filesystem.
            tracing::debug!(error = %e, "hard link failed, falling back to rename");
            if destination.exists() {
                return Err(FetchError::DestinationExists(destination.to_path_buf()));
            }
            fs::rename(part_path, destination)?;
            Ok(())
        }
    }
}

fn remove_partial(part_path: &Path) {
    match fs::remove_file(part_path) {
        Ok(()) => tracing::debug!(path = %part_path.display(), "removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %part_path.display(),
            error = %e,
            "could not remove partial download"
        ),
    }
}
