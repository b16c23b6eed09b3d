// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Values come from three places, later ones winning:
// 1. Built-in defaults (CrawlConfig::default)
// 2. An optional JSON file (--config crawl.json); missing keys keep defaults
// 3. Command-line flags
//
// Example file:
//   {
//     "max_depth": 3,
//     "rate_limit_ms": 1000,
//     "overlays": { "example.com": ["#cookie-accept"] }
//   }
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::CrawlError;
use crate::render::OverlayTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Seeds are depth 0; pages at max_depth are fetched but not expanded
    pub max_depth: usize,
    /// Pause after each page, per worker
    pub rate_limit_ms: u64,
    pub download_images: bool,
    pub capture_screenshot: bool,
    pub output_dir: PathBuf,
    pub probe_timeout_ms: u64,
    pub render_timeout_ms: u64,
    /// Concurrent page workers sharing one frontier
    pub workers: usize,
    pub user_agent: String,
    /// Probe links that were discovered but never crawled
    pub check_unvisited_links: bool,
    pub check_concurrency: usize,
    pub upgrade_to_https: bool,
    /// WebDriver server; the static renderer is used when absent
    pub webdriver_url: Option<String>,
    pub overlays: OverlayTable,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            rate_limit_ms: 500,
            download_images: false,
            capture_screenshot: false,
            output_dir: PathBuf::from("archive"),
            probe_timeout_ms: 10_000,
            render_timeout_ms: 30_000,
            workers: 1,
            user_agent: format!("site-archiver/{}", env!("CARGO_PKG_VERSION")),
            check_unvisited_links: true,
            check_concurrency: 8,
            upgrade_to_https: false,
            webdriver_url: None,
            overlays: OverlayTable::default(),
        }
    }
}

impl CrawlConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, CrawlError> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            CrawlError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            CrawlError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.workers == 0 {
            return Err(CrawlError::Config("workers must be at least 1".to_string()));
        }
        if self.probe_timeout_ms == 0 || self.render_timeout_ms == 0 {
            return Err(CrawlError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}
