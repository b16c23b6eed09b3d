// src/report/mod.rs
// =============================================================================
// Collects what the crawl learns and turns it into report files.
//
// Every result and every discovered link is appended to
// `crawl_events.jsonl` the moment it is recorded, so an interrupted crawl
// still leaves something to look at. When the crawl finishes, `write`
// produces the summary files:
//
//   crawl_results.json   one entry per page, in the order pages were taken
//   all_links.json       every (source, target) pair with the target's status
//   broken_links.json    the pairs whose target is not ok
//   incoming_links.json  target -> pages that link to it
//
// Files are overwritten, never appended to, so re-running into the same
// output directory is safe. The event log is truncated when the builder is
// created.
// =============================================================================

mod writer;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::checker::LinkStatus;
use crate::error::CrawlError;

pub use writer::ReportPaths;

pub const EVENTS_FILE: &str = "crawl_events.jsonl";

/// How far processing of a page got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Rendered, persisted and (depth permitting) expanded
    Archived,
    /// Alive but not HTML; recorded without rendering
    Leaf,
    /// Probe said the page is dead
    Broken,
    /// Alive, but rendering or persisting failed
    Failed,
}

/// One entry per dequeued task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlResult {
    pub url: String,
    pub depth: usize,
    #[serde(flatten)]
    pub status: LinkStatus,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A hyperlink seen on a crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    /// None when the target was never checked
    pub status: Option<LinkStatus>,
}

impl LinkRecord {
    pub fn is_broken(&self) -> bool {
        self.status.as_ref().is_some_and(|s| !s.is_ok())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum CrawlEvent<'a> {
    Result(&'a CrawlResult),
    Link { source: &'a str, target: &'a str },
    Status { url: &'a str, status: &'a LinkStatus },
}

pub struct ReportBuilder {
    root: PathBuf,
    events: Option<BufWriter<File>>,
    results: Vec<CrawlResult>,
    links: Vec<(String, String)>,
    link_index: HashSet<(String, String)>,
    statuses: HashMap<String, LinkStatus>,
}

impl ReportBuilder {
    /// Starts a report under `root`, truncating any previous event log.
    /// `root` must already exist.
    pub fn create(root: &Path) -> Result<Self, CrawlError> {
        let path = root.join(EVENTS_FILE);
        let file = File::create(&path).map_err(|source| CrawlError::Report {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            events: Some(BufWriter::new(file)),
            results: Vec::new(),
            links: Vec::new(),
            link_index: HashSet::new(),
            statuses: HashMap::new(),
        })
    }

    pub fn record_result(&mut self, result: CrawlResult) {
        self.stream(&CrawlEvent::Result(&result));
        self.statuses.insert(result.url.clone(), result.status.clone());
        self.results.push(result);
    }

    /// Records a link once per (source, target) pair
    pub fn record_link(&mut self, source: &str, target: &str) {
        let key = (source.to_string(), target.to_string());
        if !self.link_index.insert(key.clone()) {
            return;
        }
        self.stream(&CrawlEvent::Link { source, target });
        self.links.push(key);
    }

    /// Status of a link target that was checked without being crawled
    pub fn record_status(&mut self, url: &str, status: LinkStatus) {
        self.stream(&CrawlEvent::Status { url, status: &status });
        self.statuses.insert(url.to_string(), status);
    }

    pub fn status_of(&self, url: &str) -> Option<&LinkStatus> {
        self.statuses.get(url)
    }

    /// Link targets with no known status, in discovery order
    pub fn unresolved_targets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.links
            .iter()
            .map(|(_, target)| target)
            .filter(|t| !self.statuses.contains_key(*t) && seen.insert(*t))
            .cloned()
            .collect()
    }

    pub fn results(&self) -> &[CrawlResult] {
        &self.results
    }

    pub fn all_links(&self) -> Vec<LinkRecord> {
        self.links
            .iter()
            .map(|(source, target)| LinkRecord {
                source: source.clone(),
                target: target.clone(),
                status: self.statuses.get(target).cloned(),
            })
            .collect()
    }

    pub fn broken_links(&self) -> Vec<LinkRecord> {
        self.all_links().into_iter().filter(LinkRecord::is_broken).collect()
    }

    /// Dead pages that were seeds have no source; they still count as broken
    pub fn broken_pages(&self) -> Vec<&CrawlResult> {
        self.results.iter().filter(|r| !r.status.is_ok()).collect()
    }

    pub fn incoming_links(&self) -> BTreeMap<String, Vec<String>> {
        let mut incoming: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (source, target) in &self.links {
            incoming.entry(target.clone()).or_default().push(source.clone());
        }
        incoming
    }

    /// Writes the summary files. Calling it again rewrites them.
    pub fn write(&mut self) -> Result<ReportPaths, CrawlError> {
        if let Some(events) = self.events.as_mut() {
            if let Err(e) = events.flush() {
                warn!("Could not flush {}: {}", EVENTS_FILE, e);
            }
        }
        writer::write_all(&self.root, self)
    }

    fn stream(&mut self, event: &CrawlEvent<'_>) {
        let Some(events) = self.events.as_mut() else {
            return;
        };
        let written = serde_json::to_writer(&mut *events, event)
            .map_err(std::io::Error::from)
            .and_then(|_| events.write_all(b"\n"))
            .and_then(|_| events.flush());
        if let Err(e) = written {
            // The summary files are still written at the end
            warn!("Event log disabled after write failure: {}", e);
            self.events = None;
        }
    }
}
