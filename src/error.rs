// src/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// Three families, matching how far an error is allowed to travel:
// - UrlError:   a single link could not be turned into a crawl candidate.
//               The caller drops the link and moves on.
// - TaskError:  one page failed somewhere between probe and persistence.
//               The coordinator turns it into a CrawlResult; it never
//               reaches the frontier loop.
// - CrawlError: the run itself cannot start or finish (no seeds, no output
//               root, no renderer). These are the only errors `crawl` returns.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Why a URL string could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The string is not a URL, even relative to its base
    #[error("malformed URL '{input}': {reason}")]
    Malformed { input: String, reason: String },

    /// mailto:, javascript:, data:, ftp: ...
    #[error("unsupported scheme '{scheme}' in '{input}'")]
    UnsupportedScheme { input: String, scheme: String },

    #[error("URL has no host: {0}")]
    NoHost(String),
}

/// A failure confined to one crawl task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("probe failed: {0}")]
    Probe(String),

    #[error("render failed: {0}")]
    Render(#[from] crate::render::RenderError),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}

impl TaskError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Short stage label recorded alongside a failed CrawlResult
    pub fn stage(&self) -> &'static str {
        match self {
            TaskError::Probe(_) => "probe",
            TaskError::Render(_) => "render",
            TaskError::Filesystem { .. } => "filesystem",
            TaskError::Download { .. } => "download",
        }
    }
}

/// Fatal errors: the crawl run aborts and produces no report
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("no seed URLs given")]
    NoSeeds,

    #[error("invalid seed URL: {0}")]
    InvalidSeed(#[from] UrlError),

    #[error("cannot create output root {}: {source}", path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start renderer: {0}")]
    RendererStart(String),

    #[error("cannot write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
