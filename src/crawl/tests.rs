// src/crawl/tests.rs
// Whole-crawl tests against an in-memory site, plus one run over real HTTP.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use super::*;
use crate::checker::{extract_image_urls, HttpError, LinkStatus, Probe, ProbeResponse};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::render::{RenderError, RenderedPage, Renderer};
use crate::report::{Outcome, EVENTS_FILE};
use crate::urls::{output_location, UrlNormalizer};

#[derive(Clone)]
struct FakePage {
    status: u16,
    content_type: &'static str,
    body: String,
    render_fails: bool,
}

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, FakePage>,
    heads: Mutex<Vec<String>>,
    renders: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeSite {
    fn add(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    fn page(self, url: &str, body: &str) -> Self {
        self.add(
            url,
            FakePage {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: body.to_string(),
                render_fails: false,
            },
        )
    }

    fn status(self, url: &str, status: u16) -> Self {
        self.add(
            url,
            FakePage {
                status,
                content_type: "text/html",
                body: String::new(),
                render_fails: false,
            },
        )
    }

    fn file(self, url: &str, content_type: &'static str, body: &str) -> Self {
        self.add(
            url,
            FakePage {
                status: 200,
                content_type,
                body: body.to_string(),
                render_fails: false,
            },
        )
    }

    fn unrenderable(self, url: &str) -> Self {
        self.add(
            url,
            FakePage {
                status: 200,
                content_type: "text/html",
                body: String::new(),
                render_fails: true,
            },
        )
    }

    fn renders(&self) -> Vec<String> {
        self.renders.lock().unwrap().clone()
    }

    fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for FakeSite {
    async fn head(&self, url: &str, _timeout: Duration) -> ProbeResponse {
        self.heads.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(page) => ProbeResponse {
                status: LinkStatus::from_code(reqwest::StatusCode::from_u16(page.status).unwrap()),
                content_type: Some(page.content_type.to_string()),
                message: Some(format!("HTTP {}", page.status)),
            },
            None => ProbeResponse {
                status: LinkStatus::Broken(404),
                content_type: None,
                message: Some("HTTP 404".to_string()),
            },
        }
    }

    async fn get_bytes(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, HttpError> {
        self.pages
            .get(url)
            .map(|p| p.body.clone().into_bytes())
            .ok_or(HttpError::Status(404))
    }
}

#[async_trait]
impl Renderer for FakeSite {
    async fn render(&self, url: &Url, _timeout: Duration) -> Result<RenderedPage, RenderError> {
        self.renders.lock().unwrap().push(url.to_string());
        let page = self.pages.get(url.as_str()).ok_or(RenderError::Timeout(Duration::ZERO))?;
        if page.render_fails {
            return Err(RenderError::Driver("tab crashed".to_string()));
        }
        Ok(RenderedPage {
            url: url.clone(),
            html: page.body.clone(),
            image_urls: extract_image_urls(&page.body, url),
        })
    }

    async fn capture(&self, _page: &RenderedPage) -> Result<Vec<u8>, RenderError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn config(dir: &Path, max_depth: usize) -> CrawlConfig {
    CrawlConfig {
        max_depth,
        rate_limit_ms: 0,
        output_dir: dir.to_path_buf(),
        check_unvisited_links: false,
        ..CrawlConfig::default()
    }
}

async fn run(site: &Arc<FakeSite>, seeds: &[&str], config: CrawlConfig) -> CrawlSummary {
    try_run(site, seeds, config).await.unwrap()
}

async fn try_run(
    site: &Arc<FakeSite>,
    seeds: &[&str],
    config: CrawlConfig,
) -> Result<CrawlSummary, CrawlError> {
    let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    Crawler::new(config)
        .with_probe(site.clone())
        .with_renderer(site.clone())
        .crawl(&seeds)
        .await
}

fn crawled(summary: &CrawlSummary) -> Vec<&str> {
    summary.results.iter().map(|r| r.url.as_str()).collect()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_same_domain_cross_domain_and_image_links() {
    let site = Arc::new(
        FakeSite::default()
            .page(
                "https://example.com/",
                r#"<a href="/about">About</a><a href="https://other.com/">Other</a><a href="/logo.png">Logo</a>"#,
            )
            .page("https://example.com/about", r#"<a href="/deeper">Deeper</a>"#),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 1)).await;

    assert_eq!(crawled(&summary), vec!["https://example.com/", "https://example.com/about"]);
    assert_eq!(site.renders(), vec!["https://example.com/", "https://example.com/about"]);
    assert_eq!(summary.results[1].depth, 1);

    let all_links = read_json(&summary.reports.all_links);
    let targets: Vec<&str> = all_links
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["target"].as_str().unwrap())
        .collect();
    assert!(targets.contains(&"https://other.com/"));
    assert!(targets.contains(&"https://example.com/logo.png"));
    // Seen on a max-depth page: recorded, not followed
    assert!(targets.contains(&"https://example.com/deeper"));
    assert!(!site.heads().iter().any(|h| h.contains("other.com") || h.ends_with("logo.png")));
}

#[tokio::test]
async fn test_dead_link_is_reported_without_artifacts() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/dead">Dead</a>"#)
            .status("https://example.com/dead", 404),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 2)).await;

    let dead = &summary.results[1];
    assert_eq!(dead.url, "https://example.com/dead");
    assert_eq!(dead.status, LinkStatus::Broken(404));
    assert_eq!(dead.outcome, Outcome::Broken);

    assert_eq!(summary.broken_links.len(), 1);
    assert_eq!(summary.broken_links[0].source, "https://example.com/");
    assert_eq!(summary.broken_links[0].status, Some(LinkStatus::Broken(404)));
    assert!(summary.has_broken());

    let broken = read_json(&summary.reports.broken_links);
    assert_eq!(broken[0]["status"]["code"], 404);

    let normalizer = UrlNormalizer::for_seed("https://example.com/", false).unwrap();
    let location = output_location(&normalizer.normalize("https://example.com/dead", None).unwrap());
    assert!(!dir.path().join(location.html_file()).exists());
    assert!(!dir.path().join(location.screenshot_file()).exists());
    assert!(!site.renders().contains(&"https://example.com/dead".to_string()));
}

#[tokio::test]
async fn test_shared_page_is_fetched_once() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/a", r#"<a href="/shared">S</a>"#)
            .page("https://example.com/b", r#"<a href="/shared/">S</a><a href="/shared#top">S</a>"#)
            .page("https://example.com/shared", "<p>shared</p>"),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(
        &site,
        &["https://example.com/a", "https://example.com/b"],
        config(dir.path(), 3),
    )
    .await;

    let renders = site.renders();
    assert_eq!(renders.iter().filter(|u| u.ends_with("/shared")).count(), 1);
    assert_eq!(crawled(&summary).len(), 3);
    let incoming = read_json(&summary.reports.incoming_links);
    assert_eq!(incoming["https://example.com/shared"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_breadth_first_order() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/a">A</a><a href="/b">B</a>"#)
            .page("https://example.com/a", r#"<a href="/a1">A1</a>"#)
            .page("https://example.com/b", r#"<a href="/b1">B1</a>"#)
            .page("https://example.com/a1", "")
            .page("https://example.com/b1", ""),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 5)).await;
    assert_eq!(
        crawled(&summary),
        vec![
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/a1",
            "https://example.com/b1",
        ]
    );
}

#[tokio::test]
async fn test_depth_limit() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/1">1</a>"#)
            .page("https://example.com/1", r#"<a href="/2">2</a>"#)
            .page("https://example.com/2", r#"<a href="/3">3</a>"#)
            .page("https://example.com/3", ""),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 2)).await;
    assert_eq!(crawled(&summary).len(), 3);
    assert!(summary.results.iter().all(|r| r.depth <= 2));
    assert!(!crawled(&summary).contains(&"https://example.com/3"));

    let zero = tempfile::tempdir().unwrap();
    let summary = run(&site, &["https://example.com/"], config(zero.path(), 0)).await;
    assert_eq!(crawled(&summary), vec!["https://example.com/"]);
}

#[tokio::test]
async fn test_task_failures_do_not_stop_the_crawl() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/bad">Bad</a><a href="/good">Good</a>"#)
            .unrenderable("https://example.com/bad")
            .page("https://example.com/good", "<p>fine</p>"),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 2)).await;

    let bad = summary.results.iter().find(|r| r.url.ends_with("/bad")).unwrap();
    assert_eq!(bad.outcome, Outcome::Failed);
    assert_eq!(bad.status, LinkStatus::Ok(200));
    assert!(bad.error.as_deref().unwrap().starts_with("[render]"));

    let good = summary.results.iter().find(|r| r.url.ends_with("/good")).unwrap();
    assert_eq!(good.outcome, Outcome::Archived);
}

#[tokio::test]
async fn test_non_html_is_a_leaf() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/report.pdf">PDF</a>"#)
            .file("https://example.com/report.pdf", "application/pdf", "%PDF-1.4"),
    );
    let dir = tempfile::tempdir().unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 2)).await;
    let pdf = &summary.results[1];
    assert_eq!(pdf.outcome, Outcome::Leaf);
    assert_eq!(site.renders(), vec!["https://example.com/"]);
}

#[tokio::test]
async fn test_workers_never_take_a_url_twice() {
    let pages: Vec<String> = (0..12).map(|i| format!("https://example.com/p{}", i)).collect();
    let links: String = (0..12).map(|i| format!(r#"<a href="/p{}">p</a>"#, i)).collect();

    let mut site = FakeSite::default().page("https://example.com/", &links);
    for page in &pages {
        site = site.page(page, &links);
    }
    let site = Arc::new(site);
    let dir = tempfile::tempdir().unwrap();

    let summary = run(
        &site,
        &["https://example.com/"],
        CrawlConfig {
            workers: 4,
            ..config(dir.path(), 3)
        },
    )
    .await;

    let urls = crawled(&summary);
    let unique: HashSet<&str> = urls.iter().copied().collect();
    assert_eq!(urls.len(), 13);
    assert_eq!(unique.len(), 13);
    assert_eq!(site.renders().len(), 13);
}

#[tokio::test]
async fn test_artifacts_and_rerun_overwrites() {
    let site = Arc::new(
        FakeSite::default()
            .page(
                "https://example.com/",
                r#"<a href="/docs/intro">Intro</a><img src="/img/logo.png">"#,
            )
            .page("https://example.com/docs/intro", r#"<a href="../">Home</a>"#)
            .file("https://example.com/img/logo.png", "image/png", "PNGDATA"),
    );
    let dir = tempfile::tempdir().unwrap();
    let cfg = CrawlConfig {
        download_images: true,
        capture_screenshot: true,
        ..config(dir.path(), 2)
    };

    run(&site, &["https://example.com/"], cfg.clone()).await;

    let root_html = dir.path().join("example.com/example.com.html");
    let html = std::fs::read_to_string(&root_html).unwrap();
    assert!(html.contains(r#"href="https://example.com/docs/intro""#));
    assert!(dir.path().join("example.com/example.com.png").exists());
    assert_eq!(
        std::fs::read(dir.path().join("example.com/images/logo.png")).unwrap(),
        b"PNGDATA"
    );
    assert!(dir.path().join("example.com/docs/intro/intro.html").exists());

    let before = count_files(dir.path());
    run(&site, &["https://example.com/"], cfg).await;
    assert_eq!(count_files(dir.path()), before);
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

#[tokio::test]
async fn test_unvisited_links_are_checked_once() {
    let site = Arc::new(FakeSite::default().page(
        "https://example.com/",
        r#"<a href="https://other.com/gone">Gone</a><a href="https://other.com/gone#x">Again</a>"#,
    ));
    let dir = tempfile::tempdir().unwrap();
    let cfg = CrawlConfig {
        check_unvisited_links: true,
        ..config(dir.path(), 2)
    };

    let summary = run(&site, &["https://example.com/"], cfg).await;

    assert_eq!(crawled(&summary), vec!["https://example.com/"]);
    let checks = site.heads().iter().filter(|h| h.contains("other.com")).count();
    assert_eq!(checks, 1);
    assert_eq!(summary.broken_links.len(), 1);
    assert_eq!(summary.broken_links[0].target, "https://other.com/gone");
}

#[tokio::test]
async fn test_renderer_is_closed_after_crawl() {
    let site = Arc::new(FakeSite::default().page("https://example.com/", ""));
    let dir = tempfile::tempdir().unwrap();
    run(&site, &["https://example.com/"], config(dir.path(), 1)).await;
    assert!(site.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_every_page_failing_still_yields_a_report() {
    let site = Arc::new(FakeSite::default().status("https://example.com/", 503));
    let dir = tempfile::tempdir().unwrap();
    let summary = run(&site, &["https://example.com/"], config(dir.path(), 1)).await;
    assert_eq!(summary.results[0].outcome, Outcome::Broken);
    assert_eq!(summary.broken_pages, 1);
    assert!(summary.reports.results.exists());
}

#[tokio::test]
async fn test_fatal_startup_errors() {
    let site = Arc::new(FakeSite::default());
    let dir = tempfile::tempdir().unwrap();

    let err = try_run(&site, &[], config(dir.path(), 1)).await.unwrap_err();
    assert!(matches!(err, CrawlError::NoSeeds));

    let err = try_run(&site, &["not a url"], config(dir.path(), 1)).await.unwrap_err();
    assert!(matches!(err, CrawlError::InvalidSeed(_)));

    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();
    let err = try_run(&site, &["https://example.com/"], config(&blocker.join("out"), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::OutputRoot { .. }));
    assert!(site.heads().is_empty());
}

#[tokio::test]
async fn test_unusable_seeds_are_skipped() {
    let site = Arc::new(FakeSite::default().page("https://example.com/", ""));
    let dir = tempfile::tempdir().unwrap();

    let summary = run(
        &site,
        &["ftp://example.com/file.txt", "https://example.com/", "https://"],
        config(dir.path(), 1),
    )
    .await;

    assert_eq!(summary.seeds, vec!["https://example.com/"]);
    assert_eq!(crawled(&summary), vec!["https://example.com/"]);
}

#[tokio::test]
async fn test_filesystem_failure_is_recorded_and_crawl_continues() {
    let site = Arc::new(
        FakeSite::default()
            .page("https://example.com/", r#"<a href="/blocked">B</a><a href="/after">A</a>"#)
            .page("https://example.com/blocked", "<p>blocked</p>")
            .page("https://example.com/after", "<p>after</p>"),
    );
    let dir = tempfile::tempdir().unwrap();
    // A plain file where the page's directory has to go
    std::fs::create_dir_all(dir.path().join("example.com")).unwrap();
    std::fs::write(dir.path().join("example.com/blocked"), "in the way").unwrap();

    let summary = run(&site, &["https://example.com/"], config(dir.path(), 1)).await;

    let blocked = summary.results.iter().find(|r| r.url.ends_with("/blocked")).unwrap();
    assert_eq!(blocked.outcome, Outcome::Failed);
    assert_eq!(blocked.status, LinkStatus::Ok(200));
    assert!(blocked.error.as_deref().unwrap().starts_with("[filesystem]"));

    let after = summary.results.iter().find(|r| r.url.ends_with("/after")).unwrap();
    assert_eq!(after.outcome, Outcome::Archived);
    assert!(dir.path().join("example.com/after/after.html").exists());
}

#[tokio::test]
async fn test_renderer_start_failure_leaves_output_untouched() {
    let site = Arc::new(FakeSite::default().page("https://example.com/", ""));
    let dir = tempfile::tempdir().unwrap();
    let previous = dir.path().join("previous");
    std::fs::create_dir_all(&previous).unwrap();
    std::fs::write(previous.join(EVENTS_FILE), "old run\n").unwrap();
    let fresh = dir.path().join("fresh");

    for root in [&previous, &fresh] {
        let cfg = CrawlConfig {
            webdriver_url: Some("http://127.0.0.1:9".to_string()),
            ..config(root, 1)
        };
        let err = Crawler::new(cfg)
            .with_probe(site.clone())
            .crawl(&["https://example.com/".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::RendererStart(_)));
    }

    assert_eq!(std::fs::read_to_string(previous.join(EVENTS_FILE)).unwrap(), "old run\n");
    assert_eq!(std::fs::read_dir(&previous).unwrap().count(), 1);
    assert!(!fresh.exists());
    assert!(site.heads().is_empty());
}

#[tokio::test]
async fn test_crawl_over_http() {
    use mockito::Server;

    let mut server = Server::new_async().await;
    let home = r#"<html><body><a href="/about">About</a><a href="/missing">Missing</a></body></html>"#;
    let _head_home = server
        .mock("HEAD", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .create_async()
        .await;
    let get_home = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(home)
        .expect(1)
        .create_async()
        .await;
    let _head_about = server
        .mock("HEAD", "/about")
        .with_status(200)
        .with_header("content-type", "text/html")
        .create_async()
        .await;
    let _get_about = server
        .mock("GET", "/about")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<p>about</p>")
        .create_async()
        .await;
    let _missing = server.mock("HEAD", "/missing").with_status(404).create_async().await;

    let dir = tempfile::tempdir().unwrap();
    let summary = crawl(&[format!("{}/", server.url())], config(dir.path(), 1))
        .await
        .unwrap();

    assert_eq!(summary.pages_crawled, 3);
    assert_eq!(summary.pages_archived, 2);
    assert_eq!(summary.broken_links.len(), 1);
    assert!(summary.broken_links[0].target.ends_with("/missing"));
    get_home.assert_async().await;
}
