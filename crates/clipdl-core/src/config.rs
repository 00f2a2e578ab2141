use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::FetchSettings;
use crate::resolver::{default_browser_args, BrowserSettings};

/// How clip pages are turned into media URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverBackend {
    /// Drive headless Chrome over the DevTools protocol.
    #[default]
    Browser,
    /// Plain HTTP fetch of the page and a scan of its markup.
    Html,
}

impl std::str::FromStr for ResolverBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "browser" => Ok(ResolverBackend::Browser),
            "html" => Ok(ResolverBackend::Html),
            other => {
                anyhow::bail!("unknown resolver backend: {} (expected browser or html)", other)
            }
        }
    }
}

/// Global configuration loaded from `~/.config/clipdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Maximum jobs in flight.
    pub threads: usize,
    pub resolver: ResolverBackend,
    /// DevTools websocket of a running browser; unset launches headless Chrome.
    pub browser_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    /// Seconds to wait for a clip page to expose its video source.
    pub resolve_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Command-line switches for a launched browser.
    pub browser_args: Vec<String>,
    /// Replace files that already exist in the output directory.
    pub overwrite: bool,
    pub user_agent: Option<String>,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            threads: crate::batch::DEFAULT_WORKERS,
            resolver: ResolverBackend::default(),
            browser_url: None,
            chrome_path: None,
            resolve_timeout_secs: 10,
            connect_timeout_secs: 30,
            browser_args: default_browser_args(),
            overwrite: false,
            user_agent: None,
        }
    }
}

impl ClipConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            connect_url: self.browser_url.clone(),
            chrome_path: self.chrome_path.clone(),
            browser_args: self.browser_args.clone(),
            timeout: self.resolve_timeout(),
            max_idle_browsers: self.threads.max(1),
            user_agent: self.user_agent.clone(),
            ..BrowserSettings::default()
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: self.connect_timeout(),
            overwrite: self.overwrite,
            user_agent: self.user_agent.clone(),
            ..FetchSettings::default()
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("clipdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClipConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClipConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ClipConfig = toml::from_str(&data)?;
    Ok(cfg)
}
