// src/lib.rs
// =============================================================================
// site-archiver: crawl a website, keep a copy of every page, report the
// links that are broken.
//
// Modules:
// - urls:     normalization, same-site/image classification, output paths
// - crawl:    frontier, per-page coordinator and the `crawl` entry point
// - checker:  HTTP probing and HTML link/image extraction
// - render:   turning a URL into final HTML (plain HTTP or WebDriver)
// - report:   streamed event log and the JSON report files
// - sitemap:  seeding a crawl from sitemap XML
// - config:   CrawlConfig and its JSON file form
// - error:    error types shared by the modules above
// - logging:  tracing subscriber setup for the binary
// =============================================================================

pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod logging;
pub mod render;
pub mod report;
pub mod sitemap;
pub mod urls;

pub use config::CrawlConfig;
pub use crawl::{crawl, CrawlSummary, Crawler};
pub use error::{CrawlError, TaskError, UrlError};
