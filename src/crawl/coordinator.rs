// src/crawl/coordinator.rs
// =============================================================================
// Processes one crawl task from start to finish:
//
// 1. Probe:   HEAD the URL. Dead (4xx/5xx, timeout, DNS...) -> recorded as
//             broken, nothing else happens.
// 2. Gate:    not HTML (PDF, zip, ...) -> recorded as a leaf, not rendered.
// 3. Render:  ask the renderer for the final HTML, rewrite relative
//             references to absolute ones, and write it to the page's
//             output location. Optionally save a screenshot and the page's
//             images next to it.
// 4. Links:   every <a href> is normalized and recorded; when the task is
//             shallower than max_depth, each one is offered to the frontier
//             at depth + 1.
// 5. Wait:    the configured delay before this worker takes another task.
//
// Nothing in here returns an error to the caller. A failed step becomes a
// CrawlResult with an error message and the crawl moves on.
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::engine::{lock, CrawlState};
use super::frontier::{CrawlTask, Offer};
use crate::checker::{absolutize_references, extract_html_links, LinkStatus, Probe, ProbeResponse};
use crate::config::CrawlConfig;
use crate::error::TaskError;
use crate::render::{RenderedPage, Renderer};
use crate::report::{CrawlResult, Outcome};
use crate::urls::{image_file_name, output_location, OutputLocation, UrlNormalizer};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub output_root: PathBuf,
    pub probe_timeout: Duration,
    pub render_timeout: Duration,
    pub rate_limit: Duration,
    pub download_images: bool,
    pub capture_screenshot: bool,
}

impl CoordinatorSettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            output_root: config.output_dir.clone(),
            probe_timeout: config.probe_timeout(),
            render_timeout: config.render_timeout(),
            rate_limit: config.rate_limit(),
            download_images: config.download_images,
            capture_screenshot: config.capture_screenshot,
        }
    }
}

pub struct FetchCoordinator {
    probe: Arc<dyn Probe>,
    renderer: Arc<dyn Renderer>,
    normalizer: UrlNormalizer,
    settings: CoordinatorSettings,
}

impl FetchCoordinator {
    pub fn new(
        probe: Arc<dyn Probe>,
        renderer: Arc<dyn Renderer>,
        normalizer: UrlNormalizer,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            probe,
            renderer,
            normalizer,
            settings,
        }
    }

    /// Runs steps 1-4 for `task` and records the result
    pub async fn process(&self, task: &CrawlTask, state: &CrawlState) -> CrawlResult {
        info!("Crawling [depth {}]: {}", task.depth, task.url);

        let result = self.resolve(task, state).await;
        if let Some(error) = &result.error {
            warn!("{} ({:?}): {}", task.url, result.outcome, error);
        }

        lock(&state.report).record_result(result.clone());
        result
    }

    /// Step 5: suspends the calling worker for the configured delay
    pub async fn throttle(&self) {
        if !self.settings.rate_limit.is_zero() {
            tokio::time::sleep(self.settings.rate_limit).await;
        }
    }

    async fn resolve(&self, task: &CrawlTask, state: &CrawlState) -> CrawlResult {
        let url = task.url.as_str();

        let probe = self.probe.head(url, self.settings.probe_timeout).await;
        if !probe.status.is_ok() {
            return self.result(task, probe.status, Outcome::Broken, probe.message);
        }

        if !probe.is_html() {
            debug!("Not rendering {} ({})", url, probe.content_type.as_deref().unwrap_or("?"));
            return self.result(task, probe.status, Outcome::Leaf, None);
        }

        match self.archive(task, state).await {
            Ok(()) => self.result(task, probe.status, Outcome::Archived, None),
            Err(e) => self.failure(task, &probe, e),
        }
    }

    async fn archive(&self, task: &CrawlTask, state: &CrawlState) -> Result<(), TaskError> {
        let page = self
            .renderer
            .render(task.url.as_url(), self.settings.render_timeout)
            .await?;

        let location = output_location(&task.url).under(&self.settings.output_root);
        self.persist(&page, &location).await?;

        if self.settings.capture_screenshot {
            self.save_screenshot(&page, &location).await;
        }
        if self.settings.download_images {
            self.save_images(&page, &location).await;
        }

        self.expand(task, &page, state);
        Ok(())
    }

    async fn persist(&self, page: &RenderedPage, location: &OutputLocation) -> Result<(), TaskError> {
        tokio::fs::create_dir_all(&location.dir)
            .await
            .map_err(|e| TaskError::filesystem(&location.dir, e))?;

        let html = absolutize_references(&page.html, &page.url);
        write_file(&location.html_file(), html.as_bytes()).await
    }

    // Screenshots are a best-effort extra; the page itself is already saved
    async fn save_screenshot(&self, page: &RenderedPage, location: &OutputLocation) {
        let bytes = match self.renderer.capture(page).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("No screenshot for {}: {}", page.url, e);
                return;
            }
        };
        if let Err(e) = write_file(&location.screenshot_file(), &bytes).await {
            warn!("{}", e);
        }
    }

    async fn save_images(&self, page: &RenderedPage, location: &OutputLocation) {
        if page.image_urls.is_empty() {
            return;
        }
        let dir = location.images_dir();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("{}", TaskError::filesystem(&dir, e));
            return;
        }

        for image_url in &page.image_urls {
            if let Err(e) = self.save_image(image_url, &dir).await {
                warn!("{}", e);
            }
        }
    }

    async fn save_image(&self, image_url: &str, dir: &Path) -> Result<(), TaskError> {
        let parsed = url::Url::parse(image_url).map_err(|e| TaskError::Download {
            url: image_url.to_string(),
            reason: e.to_string(),
        })?;
        let bytes = self
            .probe
            .get_bytes(image_url, self.settings.probe_timeout)
            .await
            .map_err(|e| TaskError::Download {
                url: image_url.to_string(),
                reason: e.to_string(),
            })?;
        write_file(&dir.join(image_file_name(&parsed)), &bytes).await
    }

    // Records every link on the page and offers the crawlable ones
    fn expand(&self, task: &CrawlTask, page: &RenderedPage, state: &CrawlState) {
        let mut targets = Vec::new();
        for href in extract_html_links(&page.html) {
            match self.normalizer.normalize(&href, Some(&page.url)) {
                Ok(target) => targets.push(target),
                Err(e) => debug!("Discarding link on {}: {}", task.url, e),
            }
        }

        {
            let mut report = lock(&state.report);
            for target in &targets {
                report.record_link(task.url.as_str(), target.as_str());
            }
        }

        let mut frontier = lock(&state.frontier);
        if !frontier.should_expand(task) {
            debug!("{} is at max depth; {} link(s) not followed", task.url, targets.len());
            return;
        }

        let mut enqueued = 0;
        for target in targets {
            let label = target.to_string();
            match frontier.offer(target, task.depth + 1) {
                Offer::Enqueued => enqueued += 1,
                Offer::TooDeep => debug!("Too deep: {}", label),
                Offer::Rejected(verdict) => debug!("Not queueing {} ({:?})", label, verdict),
            }
        }
        debug!("{} new task(s) from {}", enqueued, task.url);
    }

    fn result(
        &self,
        task: &CrawlTask,
        status: LinkStatus,
        outcome: Outcome,
        error: Option<String>,
    ) -> CrawlResult {
        CrawlResult {
            url: task.url.to_string(),
            depth: task.depth,
            status,
            outcome,
            error,
        }
    }

    fn failure(&self, task: &CrawlTask, probe: &ProbeResponse, error: TaskError) -> CrawlResult {
        self.result(
            task,
            probe.status.clone(),
            Outcome::Failed,
            Some(format!("[{}] {}", error.stage(), error)),
        )
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TaskError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| TaskError::filesystem(path, e))
}
