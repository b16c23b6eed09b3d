// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
//   site <SEEDS>...        crawl starting from one or more URLs
//   sitemap <SITEMAP_URL>  crawl starting from every URL a sitemap lists
//
// Both share the same crawl flags (CrawlArgs). Every crawl flag is optional
// so that, when it is absent, the value from --config (or the built-in
// default) is kept.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use site_archiver::CrawlConfig;

#[derive(Parser, Debug)]
#[command(
    name = "site-archiver",
    version,
    about = "A CLI tool that crawls a website, archives every page and reports broken links",
    long_about = "site-archiver walks a website breadth-first from one or more seed URLs, \
                  saves the rendered HTML of every same-site page (optionally with a screenshot \
                  and its images) and writes JSON reports of every link it saw and which ones are broken."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website from one or more seed URLs
    ///
    /// Example: site-archiver site https://example.com --max-depth 2
    Site {
        /// Seed URLs; together they define the site
        #[arg(required = true)]
        seeds: Vec<String>,

        #[command(flatten)]
        args: CrawlArgs,
    },

    /// Crawl every page listed in a sitemap (or sitemap index)
    ///
    /// Example: site-archiver sitemap https://example.com/sitemap.xml
    Sitemap {
        /// URL of sitemap.xml
        sitemap_url: String,

        #[command(flatten)]
        args: CrawlArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Maximum crawl depth; seeds are depth 0
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Delay after each page, in milliseconds
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,

    /// Download the images each page references
    #[arg(long)]
    pub download_images: bool,

    /// Save a PNG screenshot of each page (needs --webdriver)
    #[arg(long)]
    pub screenshot: bool,

    /// Directory the archive and reports are written to
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Number of pages processed at the same time
    #[arg(long)]
    pub workers: Option<usize>,

    /// WebDriver server URL, e.g. http://localhost:9515
    #[arg(long)]
    pub webdriver: Option<String>,

    /// JSON file with crawl settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Don't probe links that were found but not crawled
    #[arg(long)]
    pub no_check_links: bool,

    /// Crawl over https even if the first seed is http
    #[arg(long)]
    pub https: bool,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Debug-level logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl CrawlArgs {
    /// Applies the flags that were given on top of `base`
    pub fn apply(&self, mut base: CrawlConfig) -> CrawlConfig {
        if let Some(depth) = self.max_depth {
            base.max_depth = depth;
        }
        if let Some(ms) = self.rate_limit_ms {
            base.rate_limit_ms = ms;
        }
        if let Some(dir) = &self.output {
            base.output_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            base.workers = workers;
        }
        if let Some(server) = &self.webdriver {
            base.webdriver_url = Some(server.clone());
        }
        // Switches only ever turn things on
        base.download_images |= self.download_images;
        base.capture_screenshot |= self.screenshot;
        base.upgrade_to_https |= self.https;
        if self.no_check_links {
            base.check_unvisited_links = false;
        }
        base
    }
}
