// src/urls/normalize.rs
// =============================================================================
// Canonical URL form used as the crawl's dedup key.
//
// Rules, applied in this order:
// 1. Resolve the input against the page it was found on
// 2. Force the crawl's scheme (the seed's, or https when upgrading)
// 3. Drop the fragment (#section)
// 4. Drop one trailing slash from the path, but keep the bare root "/"
// 5. Sort query parameters by key
//
// Anything that is not http(s) or that cannot be parsed is rejected with a
// UrlError. Callers discard those links; they never reach the frontier.
// =============================================================================

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::error::UrlError;

/// A URL in canonical form. Equality on this type is the frontier's dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Host, lowercased by the parser. Always present for normalized URLs.
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// Host plus any explicit port, the way the crawl scopes "same site"
    pub fn authority(&self) -> String {
        match self.0.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Normalizes URLs for one crawl. The scheme is fixed when the crawl starts.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    scheme: &'static str,
}

impl UrlNormalizer {
    /// Builds a normalizer that forces every URL onto the seed's scheme,
    /// or onto https when `upgrade_to_https` is set.
    pub fn for_seed(seed: &str, upgrade_to_https: bool) -> Result<Self, UrlError> {
        let parsed = parse(seed, None)?;
        let scheme = if upgrade_to_https || parsed.scheme() == "https" {
            "https"
        } else {
            "http"
        };
        Ok(Self { scheme })
    }

    pub fn scheme(&self) -> &str {
        self.scheme
    }

    // Normalizes `input`, resolving it against `base` when it is relative
    pub fn normalize(&self, input: &str, base: Option<&Url>) -> Result<NormalizedUrl, UrlError> {
        let mut url = parse(input, base)?;

        if url.scheme() != self.scheme && url.set_scheme(self.scheme).is_err() {
            return Err(UrlError::Malformed {
                input: input.to_string(),
                reason: format!("cannot switch scheme to {}", self.scheme),
            });
        }

        url.set_fragment(None);

        let path = url.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path[..path.len() - 1].to_string();
            url.set_path(&trimmed);
        }

        let query = url.query().map(sort_query);
        match query {
            Some(q) if !q.is_empty() => url.set_query(Some(&q)),
            _ => url.set_query(None),
        }

        Ok(NormalizedUrl(url))
    }
}

// Parses an absolute URL, or a relative one against `base`, and checks that
// the result is something the crawler can fetch
fn parse(input: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Malformed {
            input: input.to_string(),
            reason: "empty".to_string(),
        });
    }

    let url = Url::options()
        .base_url(base)
        .parse(trimmed)
        .map_err(|e| UrlError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(UrlError::UnsupportedScheme {
                input: input.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::NoHost(input.to_string()));
    }

    Ok(url)
}

// Stable sort by key, so repeated keys keep their relative order
fn sort_query(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_by(|a, b| query_key(a).cmp(query_key(b)));
    pairs.join("&")
}

fn query_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}
