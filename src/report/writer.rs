// src/report/writer.rs
// Summary files written at the end of a crawl.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::ReportBuilder;
use crate::error::CrawlError;

pub const RESULTS_FILE: &str = "crawl_results.json";
pub const ALL_LINKS_FILE: &str = "all_links.json";
pub const BROKEN_LINKS_FILE: &str = "broken_links.json";
pub const INCOMING_LINKS_FILE: &str = "incoming_links.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub all_links: PathBuf,
    pub broken_links: PathBuf,
    pub incoming_links: PathBuf,
}

pub(super) fn write_all(root: &Path, report: &ReportBuilder) -> Result<ReportPaths, CrawlError> {
    let paths = ReportPaths {
        results: root.join(RESULTS_FILE),
        all_links: root.join(ALL_LINKS_FILE),
        broken_links: root.join(BROKEN_LINKS_FILE),
        incoming_links: root.join(INCOMING_LINKS_FILE),
    };

    write_json(&paths.results, report.results())?;
    write_json(&paths.all_links, &report.all_links())?;
    write_json(&paths.broken_links, &report.broken_links())?;
    write_json(&paths.incoming_links, &report.incoming_links())?;

    Ok(paths)
}

// fs::write truncates, so a second run replaces the file
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CrawlError> {
    let report_error = |source: std::io::Error| CrawlError::Report {
        path: path.to_path_buf(),
        source,
    };
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| report_error(e.into()))?;
    fs::write(path, bytes).map_err(report_error)
}
