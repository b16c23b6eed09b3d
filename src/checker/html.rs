// src/checker/html.rs
// =============================================================================
// This module reads rendered HTML.
//
// - extract_html_links:    every <a href> on the page, as written
// - extract_image_urls:    every <img src> resolved against the page URL
// - absolutize_references: rewrites relative href/src attributes to
//                          absolute URLs, so an archived page still points
//                          at the live site when opened from disk
//
// We use `scraper` (html5ever underneath) for reading and a regex pass for
// rewriting, because scraper's DOM is read-only.
// =============================================================================

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    // Constant selector, known to be valid
    SEL.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

fn image_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("img[src]").expect("static selector"))
}

fn reference_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(\s(href|src|poster|action|srcset)\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
        )
        .expect("static regex")
    })
}

// Extracts the href of every link on the page, unresolved.
// Pure same-page anchors ("#section") are skipped.
pub fn extract_html_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(anchor_selector())
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(str::to_string)
        .collect()
}

// Extracts image sources as absolute URLs, in document order, without repeats
pub fn extract_image_urls(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut images: Vec<String> = Vec::new();

    for element in document.select(image_selector()) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let src = src.trim();
        if src.is_empty() || src.starts_with("data:") {
            continue;
        }
        if let Ok(url) = base.join(src) {
            if matches!(url.scheme(), "http" | "https") {
                let url = url.to_string();
                if !images.contains(&url) {
                    images.push(url);
                }
            }
        }
    }

    images
}

// Rewrites relative href/src/poster/action/srcset values to absolute URLs.
// Values may be double-quoted, single-quoted or bare; a bare value comes
// back double-quoted. Absolute URLs, anchors and non-navigational schemes
// are left as they are.
pub fn absolutize_references(html: &str, base: &Url) -> String {
    reference_attr_re()
        .replace_all(html, |caps: &Captures| {
            let prefix = &caps[1];
            let is_srcset = caps[2].eq_ignore_ascii_case("srcset");
            let (quote, value) = match (caps.get(3), caps.get(4), caps.get(5)) {
                (Some(v), _, _) => ('"', v.as_str()),
                (None, Some(v), _) => ('\'', v.as_str()),
                (None, None, Some(v)) => ('"', v.as_str()),
                _ => return caps[0].to_string(),
            };

            let rewritten = if is_srcset {
                absolutize_srcset(value, base)
            } else {
                absolutize(value, base)
            };
            match rewritten {
                Some(absolute) => format!("{}{}{}{}", prefix, quote, absolute, quote),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// "a.png 1x, b.png 2x": each candidate URL is resolved, descriptors kept
fn absolutize_srcset(value: &str, base: &Url) -> Option<String> {
    let mut changed = false;
    let candidates: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|candidate| {
            let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
                Some((url, descriptor)) => (url, Some(descriptor.trim())),
                None => (candidate, None),
            };
            let url = match absolutize(url, base) {
                Some(absolute) => {
                    changed = true;
                    absolute
                }
                None => url.to_string(),
            };
            match descriptor {
                Some(d) => format!("{} {}", url, d),
                None => url,
            }
        })
        .collect();

    changed.then(|| candidates.join(", "))
}

fn absolutize(value: &str, base: &Url) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    // Already absolute (has a scheme): leave it alone
    if Url::parse(trimmed).is_ok() {
        return None;
    }
    base.join(trimmed).ok().map(|u| u.to_string())
}
