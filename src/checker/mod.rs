// src/checker/mod.rs
// =============================================================================
// This module contains the network-facing and HTML-reading helpers.
//
// Submodules:
// - http: status probes, raw downloads and bulk link checks
// - html: link/image extraction and reference rewriting
// =============================================================================

mod html;
mod http;

pub use html::{absolutize_references, extract_html_links, extract_image_urls};
pub use http::{check_links, HttpClient, HttpError, LinkCheckResult, LinkStatus, Probe, ProbeResponse};
