// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive and downloads raw resources.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when a server refuses HEAD (405 / 501)
// - Detects various failure modes (404, timeout, SSL errors, etc.)
// - Reports the Content-Type so the crawler can skip non-HTML resources
// - Runs bulk checks concurrently with a bounded number of requests
//
// The crawler talks to the network through the `Probe` trait so tests can
// swap in an in-memory site.
// =============================================================================

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Represents the status of a link after checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum LinkStatus {
    /// 2xx
    Ok(u16),
    /// 3xx that was not followed (the client follows up to 5 hops)
    Redirect(u16),
    /// 4xx / 5xx
    Broken(u16),
    /// Request timed out
    Timeout,
    /// SSL/TLS certificate error
    SslError,
    /// Too many redirects (redirect loop)
    TooManyRedirects,
    /// Could not resolve hostname
    DnsError,
    /// Other error
    Error,
}

impl LinkStatus {
    pub fn from_code(code: StatusCode) -> Self {
        if code.is_success() {
            LinkStatus::Ok(code.as_u16())
        } else if code.is_redirection() {
            LinkStatus::Redirect(code.as_u16())
        } else {
            LinkStatus::Broken(code.as_u16())
        }
    }

    /// 2xx and 3xx count as alive
    pub fn is_ok(&self) -> bool {
        matches!(self, LinkStatus::Ok(_) | LinkStatus::Redirect(_))
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            LinkStatus::Ok(c) | LinkStatus::Redirect(c) | LinkStatus::Broken(c) => Some(*c),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            LinkStatus::Ok(c) => format!("OK {}", c),
            LinkStatus::Redirect(c) => format!("REDIRECT {}", c),
            LinkStatus::Broken(c) => format!("BROKEN {}", c),
            LinkStatus::Timeout => "TIMEOUT".to_string(),
            LinkStatus::SslError => "SSL ERROR".to_string(),
            LinkStatus::TooManyRedirects => "TOO MANY REDIRECTS".to_string(),
            LinkStatus::DnsError => "DNS ERROR".to_string(),
            LinkStatus::Error => "ERROR".to_string(),
        }
    }
}

/// Result of a status probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: LinkStatus,
    pub content_type: Option<String>,
    /// Human-readable detail for failures
    pub message: Option<String>,
}

impl ProbeResponse {
    /// text/html and application/xhtml+xml get rendered. A missing header is
    /// treated as HTML, since servers often omit it on HEAD.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                mime == "text/html" || mime == "application/xhtml+xml"
            }
        }
    }
}

/// Failure of a GET for a raw resource
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Network(String),
}

/// Represents the result of checking a single link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    /// The status of the link
    #[serde(flatten)]
    pub status: LinkStatus,
    /// Optional message with more details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkCheckResult {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// The crawler's view of the network
#[async_trait]
pub trait Probe: Send + Sync {
    /// Existence check; never fails, failures are folded into the status
    async fn head(&self, url: &str, timeout: Duration) -> ProbeResponse;

    /// Downloads a resource body (images, static pages, sitemaps)
    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError>;
}

/// reqwest-backed Probe
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
            .build()?;
        Ok(Self { client })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Fetches a text resource
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, HttpError> {
        self.get_page(url, timeout).await.map(|(_, text)| text)
    }

    /// Fetches a text resource along with the URL it was finally served
    /// from, after redirects
    pub async fn get_page(&self, url: &str, timeout: Duration) -> Result<(Url, String), HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpError::Status(response.status().as_u16()));
        }

        let final_url = response.url().clone();
        let text = response.text().await.map_err(|e| HttpError::Network(e.to_string()))?;
        Ok((final_url, text))
    }
}

#[async_trait]
impl Probe for HttpClient {
    async fn head(&self, url: &str, timeout: Duration) -> ProbeResponse {
        let result = self.client.head(url).timeout(timeout).send().await;

        match result {
            // Some servers do not implement HEAD; ask again with GET
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                match self.client.get(url).timeout(timeout).send().await {
                    Ok(response) => analyze_response(response),
                    Err(e) => categorize_error(e),
                }
            }
            Ok(response) => analyze_response(response),
            Err(e) => categorize_error(e),
        }
    }

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HttpError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// Analyzes an HTTP response to determine link status
fn analyze_response(response: reqwest::Response) -> ProbeResponse {
    let code = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let message = if code.is_redirection() {
        // Try to get the Location header to show where it redirects to
        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|loc| format!("HTTP {} -> {}", code.as_u16(), loc))
    } else {
        Some(format!("HTTP {}", code.as_u16()))
    };

    ProbeResponse {
        status: LinkStatus::from_code(code),
        content_type,
        message,
    }
}

// Categorizes different error types from reqwest
fn categorize_error(error: reqwest::Error) -> ProbeResponse {
    let error_string = error.to_string();
    let lowered = error_string.to_ascii_lowercase();

    let (status, message) = if error.is_timeout() {
        (LinkStatus::Timeout, "Request timed out".to_string())
    } else if error.is_redirect() {
        (LinkStatus::TooManyRedirects, "Too many redirects".to_string())
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if lowered.contains("dns") {
            (LinkStatus::DnsError, "Could not resolve hostname".to_string())
        } else {
            (LinkStatus::Error, "Connection failed".to_string())
        }
    } else if lowered.contains("certificate") || lowered.contains("ssl") {
        (LinkStatus::SslError, "SSL certificate error".to_string())
    } else {
        (LinkStatus::Error, error_string)
    };

    ProbeResponse {
        status,
        content_type: None,
        message: Some(message),
    }
}

/// Checks multiple links, at most `concurrency` at a time
pub async fn check_links(
    probe: &dyn Probe,
    urls: Vec<String>,
    concurrency: usize,
    timeout: Duration,
) -> Vec<LinkCheckResult> {
    let futures = urls.into_iter().map(|url| async move {
        let response = probe.head(&url, timeout).await;
        LinkCheckResult {
            url,
            status: response.status,
            message: response.message,
        }
    });

    stream::iter(futures)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
