// src/crawl/engine.rs
// =============================================================================
// The crawl entry point.
//
// How a run goes:
// 1. Normalize the seeds; the usable ones together define "the site"
// 2. Acquire the renderer (failure here aborts the run)
// 3. Create the output root and the event log (failure here aborts the run)
// 4. Start `workers` tasks that share one frontier and one report. Each
//    worker pops a task, runs it through the coordinator, marks it
//    complete, waits out the rate limit, and repeats until the frontier is
//    empty with nothing in flight
// 5. Probe link targets that were discovered but never crawled
// 6. Write the report files and close the renderer
//
// The frontier and the report each sit behind a std Mutex. Neither lock is
// ever held across an .await, so a blocking mutex is the right tool here.
// =============================================================================

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use super::coordinator::{CoordinatorSettings, FetchCoordinator};
use super::frontier::{CrawlTask, Frontier, FrontierState};
use crate::checker::{check_links, HttpClient, Probe};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::render::{Renderer, StaticRenderer, WebDriverRenderer};
use crate::report::{CrawlResult, LinkRecord, Outcome, ReportBuilder, ReportPaths};
use crate::urls::{LinkClassifier, NormalizedUrl, UrlNormalizer};

/// What a finished crawl hands back
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub seeds: Vec<String>,
    pub max_depth: usize,
    pub pages_crawled: usize,
    pub pages_archived: usize,
    pub total_links: usize,
    pub broken_links: Vec<LinkRecord>,
    pub broken_pages: usize,
    pub elapsed_ms: u64,
    pub reports: ReportPaths,
    pub results: Vec<CrawlResult>,
}

impl CrawlSummary {
    pub fn has_broken(&self) -> bool {
        !self.broken_links.is_empty() || self.broken_pages > 0
    }
}

/// Shared by every worker of one crawl
pub struct CrawlState {
    pub(crate) frontier: Mutex<Frontier>,
    pub(crate) report: Mutex<ReportBuilder>,
    work: Notify,
}

// A panic in one worker must not wedge the others on a poisoned lock
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Next {
    Task(CrawlTask),
    Wait,
    Done,
}

impl CrawlState {
    fn next(&self) -> Next {
        let mut frontier = lock(&self.frontier);
        if let Some(task) = frontier.pop() {
            return Next::Task(task);
        }
        match frontier.state() {
            FrontierState::Empty => Next::Done,
            _ => Next::Wait,
        }
    }
}

// Marks the task complete even if the worker unwinds mid-task
struct InFlight<'a> {
    state: &'a CrawlState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(&self.state.frontier).complete();
        self.state.work.notify_waiters();
    }
}

/// Crawl engine with pluggable network and renderer collaborators
pub struct Crawler {
    config: CrawlConfig,
    probe: Option<Arc<dyn Probe>>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            probe: None,
            renderer: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub async fn crawl(self, seeds: &[String]) -> Result<CrawlSummary, CrawlError> {
        self.config.validate()?;
        let started = Instant::now();

        let (normalizer, seeds) = normalize_seeds(seeds, self.config.upgrade_to_https)?;

        // Collaborators first: a failed start must leave the output root untouched
        let probe: Arc<dyn Probe> = match self.probe.clone() {
            Some(probe) => probe,
            None => Arc::new(http_client(&self.config)?),
        };
        let renderer = match self.renderer.clone() {
            Some(renderer) => renderer,
            None => acquire_renderer(&self.config).await?,
        };
        info!("Using the {} renderer", renderer.name());

        let outcome = match self.open_report() {
            Ok(report) => {
                self.run(normalizer, &seeds, probe, renderer.clone(), report, started)
                    .await
            }
            Err(e) => Err(e),
        };

        // Released on every path out of the run
        if let Err(e) = renderer.close().await {
            warn!("Renderer close failed: {}", e);
        }
        outcome
    }

    fn open_report(&self) -> Result<ReportBuilder, CrawlError> {
        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| {
            CrawlError::OutputRoot {
                path: self.config.output_dir.clone(),
                source,
            }
        })?;
        ReportBuilder::create(&self.config.output_dir)
    }

    async fn run(
        &self,
        normalizer: UrlNormalizer,
        seeds: &[NormalizedUrl],
        probe: Arc<dyn Probe>,
        renderer: Arc<dyn Renderer>,
        report: ReportBuilder,
        started: Instant,
    ) -> Result<CrawlSummary, CrawlError> {
        let classifier = LinkClassifier::new(seeds.iter().map(NormalizedUrl::authority));
        let mut frontier = Frontier::new(classifier, self.config.max_depth);
        for seed in seeds {
            frontier.seed(seed.clone());
        }

        let state = Arc::new(CrawlState {
            frontier: Mutex::new(frontier),
            report: Mutex::new(report),
            work: Notify::new(),
        });
        let coordinator = Arc::new(FetchCoordinator::new(
            probe.clone(),
            renderer,
            normalizer,
            CoordinatorSettings::from_config(&self.config),
        ));

        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| tokio::spawn(worker(id, state.clone(), coordinator.clone())))
            .collect();
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Crawl worker stopped abnormally: {}", e);
            }
        }

        if self.config.check_unvisited_links {
            check_unvisited(&state, probe.as_ref(), &self.config).await;
        }

        let mut report = lock(&state.report);
        let reports = report.write()?;
        let results = report.results().to_vec();
        let broken_links = report.broken_links();

        let summary = CrawlSummary {
            seeds: seeds.iter().map(ToString::to_string).collect(),
            max_depth: self.config.max_depth,
            pages_crawled: results.len(),
            pages_archived: results.iter().filter(|r| r.outcome == Outcome::Archived).count(),
            total_links: report.all_links().len(),
            broken_pages: report.broken_pages().len(),
            broken_links,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            reports,
            results,
        };

        info!(
            "Crawl finished: {} page(s), {} archived, {} broken link(s) in {} ms",
            summary.pages_crawled,
            summary.pages_archived,
            summary.broken_links.len(),
            summary.elapsed_ms
        );
        Ok(summary)
    }
}

/// Crawls `seeds` with the default HTTP client and the renderer named by
/// `config` (WebDriver when `webdriver_url` is set, static otherwise)
pub async fn crawl(seeds: &[String], config: CrawlConfig) -> Result<CrawlSummary, CrawlError> {
    Crawler::new(config).crawl(seeds).await
}

async fn worker(id: usize, state: Arc<CrawlState>, coordinator: Arc<FetchCoordinator>) {
    loop {
        // Registered before looking at the frontier so a completion that
        // lands in between still wakes us
        let notified = state.work.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match state.next() {
            Next::Done => {
                state.work.notify_waiters();
                break;
            }
            Next::Wait => notified.await,
            Next::Task(task) => {
                let in_flight = InFlight { state: &state };
                coordinator.process(&task, &state).await;
                drop(in_flight);
                coordinator.throttle().await;
            }
        }
    }
    tracing::debug!("Worker {} finished", id);
}

async fn check_unvisited(state: &CrawlState, probe: &dyn Probe, config: &CrawlConfig) {
    let targets = lock(&state.report).unresolved_targets();
    if targets.is_empty() {
        return;
    }
    info!("Checking {} link(s) that were not crawled", targets.len());

    let results = check_links(probe, targets, config.check_concurrency, config.probe_timeout()).await;
    let mut report = lock(&state.report);
    for result in results {
        report.record_status(&result.url, result.status);
    }
}

fn normalize_seeds(
    seeds: &[String],
    upgrade_to_https: bool,
) -> Result<(UrlNormalizer, Vec<NormalizedUrl>), CrawlError> {
    if seeds.is_empty() {
        return Err(CrawlError::NoSeeds);
    }

    // The first usable seed fixes the crawl scheme; unusable seeds are skipped
    let mut normalizer: Option<UrlNormalizer> = None;
    let mut usable = Vec::new();
    let mut last_error = None;
    for seed in seeds {
        let attempt = if let Some(n) = &normalizer {
            n.normalize(seed, None)
        } else {
            match UrlNormalizer::for_seed(seed, upgrade_to_https) {
                Ok(n) => {
                    let url = n.normalize(seed, None);
                    if url.is_ok() {
                        normalizer = Some(n);
                    }
                    url
                }
                Err(e) => Err(e),
            }
        };
        match attempt {
            Ok(url) => usable.push(url),
            Err(e) => {
                warn!("Skipping seed {}: {}", seed, e);
                last_error = Some(e);
            }
        }
    }

    match (normalizer, last_error) {
        (Some(n), _) => Ok((n, usable)),
        (None, Some(e)) => Err(CrawlError::InvalidSeed(e)),
        (None, None) => Err(CrawlError::NoSeeds),
    }
}

fn http_client(config: &CrawlConfig) -> Result<HttpClient, CrawlError> {
    HttpClient::new(&config.user_agent).map_err(|e| CrawlError::RendererStart(e.to_string()))
}

async fn acquire_renderer(config: &CrawlConfig) -> Result<Arc<dyn Renderer>, CrawlError> {
    match &config.webdriver_url {
        Some(server) => {
            let renderer = WebDriverRenderer::connect(server, config.overlays.clone(), config.render_timeout())
                .await
                .map_err(|e| CrawlError::RendererStart(format!("{}: {}", server, e)))?;
            Ok(Arc::new(renderer))
        }
        None => {
            if !config.overlays.is_empty() {
                warn!("Overlay selectors are ignored by the static renderer");
            }
            Ok(Arc::new(StaticRenderer::new(http_client(config)?)))
        }
    }
}
