// src/render/mod.rs
// =============================================================================
// The renderer turns a URL into the HTML a visitor would actually see.
//
// Two implementations:
// - StaticRenderer:    plain GET through the HTTP client. No JavaScript, no
//                      screenshots. The default.
// - WebDriverRenderer: drives a headless browser over WebDriver. Runs the
//                      page's scripts, dismisses cookie overlays, and can
//                      capture screenshots.
//
// A renderer is acquired once per crawl and closed when the crawl ends,
// whichever way it ends.
// =============================================================================

mod http;
mod webdriver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::checker::HttpError;

pub use http::StaticRenderer;
pub use webdriver::WebDriverRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch failed: {0}")]
    Http(#[from] HttpError),

    #[error("browser error: {0}")]
    Driver(String),

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("renderer is closed")]
    Closed,
}

/// Fully rendered content of one page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
    /// Absolute URLs of every image the page references
    pub image_urls: Vec<String>,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Loads `url` and returns its rendered HTML
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError>;

    /// PNG image of a page previously returned by `render`
    async fn capture(&self, page: &RenderedPage) -> Result<Vec<u8>, RenderError>;

    /// Releases the underlying resource. Safe to call more than once.
    async fn close(&self) -> Result<(), RenderError>;

    fn name(&self) -> &'static str;
}

/// Cookie-banner selectors to click, keyed by domain
///
/// An entry for `example.com` also covers `www.example.com` and any other
/// subdomain; the most specific entry wins. Hosts without an entry get no
/// dismissal step at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayTable {
    entries: HashMap<String, Vec<String>>,
}

impl OverlayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: impl Into<String>, selectors: Vec<String>) {
        self.entries.insert(domain.into().to_ascii_lowercase(), selectors);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selectors_for(&self, host: &str) -> &[String] {
        let host = host.to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(selectors) = self.entries.get(candidate) {
                return selectors;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return &[],
            }
        }
    }
}
