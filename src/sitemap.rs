// src/sitemap.rs
// =============================================================================
// Reads sitemap XML to seed a crawl.
//
// Handles both flavours:
//   <urlset><url><loc>https://example.com/a</loc></url>...</urlset>
//   <sitemapindex><sitemap><loc>https://example.com/s1.xml</loc></sitemap>...
//
// An index is followed one level deep. Nothing else in the crawl depends on
// this module; it only produces seed URLs.
// =============================================================================

use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::checker::{HttpClient, HttpError};

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("invalid sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("cannot fetch sitemap {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: HttpError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    UrlSet,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    pub kind: SitemapKind,
    pub locations: Vec<String>,
}

pub fn parse(xml: &str) -> Result<Sitemap, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut kind = SitemapKind::UrlSet;
    let mut locations = Vec::new();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemapindex" => kind = SitemapKind::Index,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_loc => {
                let text = t.unescape()?;
                current.push_str(&text);
            }
            Event::CData(c) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    locations.push(loc.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Sitemap { kind, locations })
}

/// Fetches a sitemap and returns the page URLs it lists
pub async fn fetch_seeds(
    client: &HttpClient,
    sitemap_url: &str,
    timeout: Duration,
) -> Result<Vec<String>, SitemapError> {
    let sitemap = fetch(client, sitemap_url, timeout).await?;
    if sitemap.kind == SitemapKind::UrlSet {
        info!("Sitemap {} lists {} page(s)", sitemap_url, sitemap.locations.len());
        return Ok(sitemap.locations);
    }

    let mut pages = Vec::new();
    for child_url in &sitemap.locations {
        match fetch(client, child_url, timeout).await {
            Ok(child) if child.kind == SitemapKind::UrlSet => pages.extend(child.locations),
            Ok(_) => warn!("Skipping nested sitemap index {}", child_url),
            Err(e) => warn!("Skipping sitemap {}: {}", child_url, e),
        }
    }
    info!(
        "Sitemap index {} lists {} page(s) across {} sitemap(s)",
        sitemap_url,
        pages.len(),
        sitemap.locations.len()
    );
    Ok(pages)
}

async fn fetch(client: &HttpClient, url: &str, timeout: Duration) -> Result<Sitemap, SitemapError> {
    let xml = client
        .get_text(url, timeout)
        .await
        .map_err(|source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        })?;
    parse(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/</loc><lastmod>2024-01-01</lastmod></url>
              <url><loc> https://example.com/a?x=1&amp;y=2 </loc></url>
            </urlset>"#;
        let sitemap = parse(xml).unwrap();
        assert_eq!(sitemap.kind, SitemapKind::UrlSet);
        assert_eq!(sitemap.locations, vec!["https://example.com/", "https://example.com/a?x=1&y=2"]);
    }

    #[test]
    fn test_parse_index() {
        let xml = r#"<sitemapindex><sitemap><loc>https://example.com/s1.xml</loc></sitemap></sitemapindex>"#;
        let sitemap = parse(xml).unwrap();
        assert_eq!(sitemap.kind, SitemapKind::Index);
        assert_eq!(sitemap.locations, vec!["https://example.com/s1.xml"]);
    }

    #[test]
    fn test_parse_rejects_broken_xml() {
        assert!(parse("<urlset><url><loc>x</url></urlset>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_follows_index_one_level() {
        let mut server = Server::new_async().await;
        let index = format!(
            "<sitemapindex><sitemap><loc>{0}/pages.xml</loc></sitemap><sitemap><loc>{0}/missing.xml</loc></sitemap></sitemapindex>",
            server.url()
        );
        let _index = server.mock("GET", "/sitemap.xml").with_status(200).with_body(index).create_async().await;
        let _pages = server
            .mock("GET", "/pages.xml")
            .with_status(200)
            .with_body("<urlset><url><loc>https://example.com/a</loc></url></urlset>")
            .create_async()
            .await;
        let _missing = server.mock("GET", "/missing.xml").with_status(404).create_async().await;

        let client = HttpClient::new("test-agent").unwrap();
        let seeds = fetch_seeds(&client, &format!("{}/sitemap.xml", server.url()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(seeds, vec!["https://example.com/a"]);
    }
}
