// src/render/http.rs
// =============================================================================
// Renderer that takes the server's HTML as-is.
//
// Good enough for server-rendered sites. Pages that build their content in
// JavaScript need the WebDriver renderer instead.
// =============================================================================

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::{RenderError, RenderedPage, Renderer};
use crate::checker::{extract_image_urls, HttpClient};

#[derive(Debug, Clone)]
pub struct StaticRenderer {
    client: HttpClient,
}

impl StaticRenderer {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError> {
        // Relative references resolve against where the page ended up
        let (final_url, html) = self.client.get_page(url.as_str(), timeout).await?;
        let image_urls = extract_image_urls(&html, &final_url);
        Ok(RenderedPage {
            url: final_url,
            html,
            image_urls,
        })
    }

    async fn capture(&self, _page: &RenderedPage) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Unsupported(
            "screenshots need a browser; pass --webdriver",
        ))
    }

    async fn close(&self) -> Result<(), RenderError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
