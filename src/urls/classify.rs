// src/urls/classify.rs
// =============================================================================
// Decides whether a discovered link becomes a crawl task.
//
// A link is rejected when:
// - it points to another site (recorded in the link report, never crawled)
// - it looks like an image asset: a known image extension, an image
//   extension disguised behind ".html" (logo.png.html), or a query
//   parameter whose value names an image file (?src=banner.jpg)
// - it is already visited or already queued
//
// Accepting a link marks it as queued in the same call, while the caller
// holds the frontier, so a link found on two pages is only queued once.
// =============================================================================

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::NormalizedUrl;
use crate::crawl::VisitedSet;

/// Outcome of classifying one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Crawlable,
    CrossDomain,
    ImageAsset,
    AlreadySeen,
}

impl Verdict {
    pub fn is_crawlable(self) -> bool {
        self == Verdict::Crawlable
    }
}

const IMAGE_EXTENSIONS: &str = "png|jpe?g|gif|svg|webp|bmp|ico|tiff?|avif|heic";

fn image_extension_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\.({})$", IMAGE_EXTENSIONS)).expect("static regex")
    })
}

fn disguised_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\.({})\.html?$", IMAGE_EXTENSIONS)).expect("static regex")
    })
}

/// Scopes a crawl to the seed sites and filters out non-page links
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    sites: HashSet<String>,
}

impl LinkClassifier {
    /// `sites` are the authorities (host[:port]) of the seeds
    pub fn new<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sites: sites.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_same_site(&self, url: &NormalizedUrl) -> bool {
        self.sites.contains(&url.authority())
    }

    // Classifies `candidate` and, when it is crawlable, marks it queued
    pub fn classify(&self, candidate: &NormalizedUrl, seen: &mut VisitedSet) -> Verdict {
        if !self.is_same_site(candidate) {
            return Verdict::CrossDomain;
        }
        if is_image_asset(candidate) {
            return Verdict::ImageAsset;
        }
        if !seen.mark_queued(candidate) {
            return Verdict::AlreadySeen;
        }
        Verdict::Crawlable
    }
}

pub fn is_image_asset(url: &NormalizedUrl) -> bool {
    let path = url.as_url().path();
    if image_extension_re().is_match(path) || disguised_image_re().is_match(path) {
        return true;
    }

    url.as_url()
        .query_pairs()
        .any(|(_, value)| image_extension_re().is_match(value.trim()))
}
