// src/urls/taxonomy.rs
// =============================================================================
// Maps a URL to the place its artifacts live under the output root.
//
//   https://example.com/           -> example.com/            base "example.com"
//   https://example.com/docs/intro -> example.com/docs/intro/ base "intro"
//   https://example.com/list?p=2   -> example.com/list_p_2_<h>/ base "list_p_2_<h>"
//
// <h> is a short digest of the raw query.
//
// Every segment is sanitized to [A-Za-z0-9._-]; anything else becomes '_'.
// The mapping is pure: the same URL always lands in the same place, so a
// re-crawl overwrites the previous artifacts instead of adding new ones.
// Creating the directories is the writer's job, not this module's.
// =============================================================================

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::NormalizedUrl;

/// Where one page's artifacts go, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    /// Directory, relative to the output root
    pub dir: PathBuf,
    /// File stem shared by `<base>.html` and `<base>.png`
    pub base_name: String,
}

impl OutputLocation {
    pub fn html_file(&self) -> PathBuf {
        self.dir.join(format!("{}.html", self.base_name))
    }

    pub fn screenshot_file(&self) -> PathBuf {
        self.dir.join(format!("{}.png", self.base_name))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    /// Same location anchored at an output root
    pub fn under(&self, root: &Path) -> OutputLocation {
        OutputLocation {
            dir: root.join(&self.dir),
            base_name: self.base_name.clone(),
        }
    }
}

pub fn output_location(url: &NormalizedUrl) -> OutputLocation {
    let host = sanitize_segment(&url.authority());

    let mut segments: Vec<String> = url
        .as_url()
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).map(sanitize_segment).collect())
        .unwrap_or_default();

    // The query picks out a distinct page, so it joins the last segment.
    // The digest keeps `/list?page=2` apart from a literal `/list_page_2`.
    if let Some(query) = url.as_url().query() {
        let query = format!("{}_{}", sanitize_segment(query), query_digest(query));
        match segments.last_mut() {
            Some(last) => {
                last.push('_');
                last.push_str(&query);
            }
            None => segments.push(query),
        }
    }

    let base_name = segments.last().cloned().unwrap_or_else(|| host.clone());

    let mut dir = PathBuf::from(&host);
    for segment in &segments {
        dir.push(segment);
    }

    OutputLocation { dir, base_name }
}

// First 8 hex digits of the query's SHA-256
fn query_digest(query: &str) -> String {
    let hex = format!("{:x}", Sha256::digest(query.as_bytes()));
    hex[..8].to_string()
}

/// Replaces every character outside [A-Za-z0-9._-] with '_'
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // "." and ".." would escape the tree
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// File name for a downloaded image, taken from the last path segment
pub fn image_file_name(image_url: &url::Url) -> String {
    let last = image_url
        .path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        .unwrap_or("image");
    let mut name = sanitize_segment(last);
    if let Some(query) = image_url.query() {
        name = format!("{}_{}", name, sanitize_segment(query));
    }
    name
}
