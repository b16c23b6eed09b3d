// src/render/webdriver.rs
// =============================================================================
// Headless-browser renderer over WebDriver (chromedriver, geckodriver, or a
// Selenium grid).
//
// One browser session serves the whole crawl. The session is a single tab,
// so it sits behind a mutex and each render holds that mutex from
// navigation until the page source has been read.
// =============================================================================

use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{OverlayTable, RenderError, RenderedPage, Renderer};
use crate::checker::extract_image_urls;

pub struct WebDriverRenderer {
    driver: Mutex<Option<WebDriver>>,
    overlays: OverlayTable,
}

fn driver_error(e: WebDriverError) -> RenderError {
    RenderError::Driver(e.to_string())
}

impl WebDriverRenderer {
    /// Starts a headless Chrome session on the WebDriver server at `server_url`
    pub async fn connect(
        server_url: &str,
        overlays: OverlayTable,
        page_load_timeout: Duration,
    ) -> Result<Self, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.set_headless().map_err(driver_error)?;
        caps.add_chrome_arg("--disable-dev-shm-usage").map_err(driver_error)?;
        caps.add_chrome_arg("--window-size=1366,900").map_err(driver_error)?;

        let driver = WebDriver::new(server_url, caps).await.map_err(driver_error)?;
        driver
            .set_page_load_timeout(page_load_timeout)
            .await
            .map_err(driver_error)?;

        info!("Browser session started on {}", server_url);

        Ok(Self {
            driver: Mutex::new(Some(driver)),
            overlays,
        })
    }

    // Clicks every configured overlay selector for the page's host.
    // Missing elements and failed clicks are ignored.
    async fn dismiss_overlays(&self, driver: &WebDriver, url: &Url) {
        let host = url.host_str().unwrap_or_default();
        for selector in self.overlays.selectors_for(host) {
            match driver.find_all(By::Css(selector.as_str())).await {
                Ok(elements) => {
                    for element in elements {
                        if let Err(e) = element.click().await {
                            debug!("Overlay click on '{}' failed: {}", selector, e);
                        }
                    }
                }
                Err(e) => debug!("Overlay selector '{}' not found on {}: {}", selector, url, e),
            }
        }
    }

    async fn load(&self, driver: &WebDriver, url: &Url) -> Result<RenderedPage, RenderError> {
        driver.goto(url.as_str()).await.map_err(driver_error)?;
        self.dismiss_overlays(driver, url).await;

        let html = driver.source().await.map_err(driver_error)?;
        let image_urls = extract_image_urls(&html, url);

        Ok(RenderedPage {
            url: url.clone(),
            html,
            image_urls,
        })
    }
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, RenderError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(RenderError::Closed)?;

        tokio::time::timeout(timeout, self.load(driver, url))
            .await
            .map_err(|_| RenderError::Timeout(timeout))?
    }

    async fn capture(&self, page: &RenderedPage) -> Result<Vec<u8>, RenderError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(RenderError::Closed)?;

        // Another worker may have navigated the tab since `render` returned
        let current = driver.current_url().await.map_err(driver_error)?;
        if current.as_str() != page.url.as_str() {
            driver.goto(page.url.as_str()).await.map_err(driver_error)?;
            self.dismiss_overlays(driver, &page.url).await;
        }

        driver.screenshot_as_png().await.map_err(driver_error)
    }

    async fn close(&self) -> Result<(), RenderError> {
        let driver = self.driver.lock().await.take();
        if let Some(driver) = driver {
            if let Err(e) = driver.quit().await {
                warn!("Browser session did not shut down cleanly: {}", e);
                return Err(driver_error(e));
            }
            info!("Browser session closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webdriver"
    }
}
