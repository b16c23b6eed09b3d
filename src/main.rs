// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, plus an optional file)
// 3. Build the crawl configuration: defaults < --config file < flags
// 4. Work out the seeds (given directly, or read from a sitemap)
// 5. Crawl, print the summary
// 6. Exit with proper code (0 = clean, 1 = broken links, 2 = error)
// =============================================================================

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use cli::{Cli, Commands, CrawlArgs};
use site_archiver::checker::{HttpClient, LinkStatus};
use site_archiver::report::Outcome;
use site_archiver::{sitemap, CrawlConfig, CrawlSummary};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = nothing broken
//   Ok(1) = broken links or pages found
//   Err   = the crawl could not run
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let (seeds, sitemap_url, args) = match cli.command {
        Commands::Site { seeds, args } => (seeds, None, args),
        Commands::Sitemap { sitemap_url, args } => (Vec::new(), Some(sitemap_url), args),
    };

    site_archiver::logging::init_logging(args.verbose, args.log_file.clone())
        .context("cannot set up logging")?;
    let config = build_config(&args)?;

    let seeds = match sitemap_url {
        Some(url) => sitemap_seeds(&url, &config).await?,
        None => seeds,
    };

    // stdout carries nothing but the JSON document in --json mode
    if !args.json {
        println!("🔍 Crawling {} seed(s) into {}", seeds.len(), config.output_dir.display());
        println!("📊 Max crawl depth: {}", config.max_depth);
    }

    let summary = site_archiver::crawl(&seeds, config).await?;
    print_results(&summary, args.json)?;

    Ok(if summary.has_broken() { 1 } else { 0 })
}

fn build_config(args: &CrawlArgs) -> Result<CrawlConfig> {
    let base = match &args.config {
        Some(path) => CrawlConfig::load_from_file(path)?,
        None => CrawlConfig::default(),
    };
    Ok(args.apply(base))
}

async fn sitemap_seeds(sitemap_url: &str, config: &CrawlConfig) -> Result<Vec<String>> {
    info!("Reading sitemap: {}", sitemap_url);
    let client = HttpClient::new(&config.user_agent)?;
    let locations = sitemap::fetch_seeds(&client, sitemap_url, config.probe_timeout()).await?;

    let seeds: Vec<String> = locations
        .into_iter()
        .filter(|loc| match Url::parse(loc) {
            Ok(_) => true,
            Err(e) => {
                warn!("Skipping sitemap entry {}: {}", loc, e);
                false
            }
        })
        .collect();

    if seeds.is_empty() {
        bail!("sitemap {} lists no usable URLs", sitemap_url);
    }
    Ok(seeds)
}

fn print_results(summary: &CrawlSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print_table(summary);
    }
    Ok(())
}

fn print_table(summary: &CrawlSummary) {
    println!("{:<60} {:<6} {:<22} {:<10}", "URL", "DEPTH", "STATUS", "OUTCOME");
    println!("{}", "=".repeat(100));

    for result in &summary.results {
        println!(
            "{:<60} {:<6} {:<22} {:<10}",
            truncate(&result.url),
            result.depth,
            format_status(&result.status),
            format_outcome(result.outcome)
        );
        if let Some(error) = &result.error {
            println!("    ↳ {}", error);
        }
    }

    if !summary.broken_links.is_empty() {
        println!("\n❌ Broken links:");
        for link in &summary.broken_links {
            let status = link.status.as_ref().map(format_status).unwrap_or_default();
            println!("   {} -> {} ({})", link.source, link.target, status);
        }
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Pages crawled: {}", summary.pages_crawled);
    println!("   💾 Pages archived: {}", summary.pages_archived);
    println!("   🔗 Links seen: {}", summary.total_links);
    println!("   ❌ Broken links: {}", summary.broken_links.len());
    println!("   ⏱️  Elapsed: {} ms", summary.elapsed_ms);
    println!("   📁 Reports: {}", summary.reports.results.display());
}

fn truncate(url: &str) -> String {
    if url.chars().count() > 57 {
        let head: String = url.chars().take(57).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}

fn format_status(status: &LinkStatus) -> String {
    match status {
        LinkStatus::Ok(_) => "✅ OK".to_string(),
        LinkStatus::Redirect(code) => format!("🔀 REDIRECT {}", code),
        LinkStatus::Broken(code) => format!("❌ BROKEN {}", code),
        LinkStatus::Timeout => "⏱️  TIMEOUT".to_string(),
        LinkStatus::SslError => "🔒 SSL ERROR".to_string(),
        LinkStatus::TooManyRedirects => "🔁 TOO MANY REDIRECTS".to_string(),
        LinkStatus::DnsError => "🌐 DNS ERROR".to_string(),
        LinkStatus::Error => "⚠️  ERROR".to_string(),
    }
}

fn format_outcome(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Archived => "archived",
        Outcome::Leaf => "leaf",
        Outcome::Broken => "broken",
        Outcome::Failed => "failed",
    }
}
