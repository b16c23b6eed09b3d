// src/logging.rs
// =============================================================================
// Logging setup for the CLI.
//
// Log lines go to stderr so that `--json` output on stdout stays clean.
// RUST_LOG, when set, decides the filter (--verbose still raises
// site_archiver to debug). Otherwise: `site_archiver=info` (or `debug` with
// --verbose) and `warn` for everything else.
// With --log-file the same events are also written, without colours, to a
// file.
// =============================================================================

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(verbose, rust_log.as_deref())?;

    let stderr_layer = fmt::layer().with_target(verbose).with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::File::create(&path)?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn build_filter(verbose: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let filter = match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => {
            let filter = EnvFilter::try_new(directives)?;
            if verbose {
                filter.add_directive("site_archiver=debug".parse()?)
            } else {
                filter
            }
        }
        None => {
            let level = if verbose { "debug" } else { "info" };
            EnvFilter::try_new(format!("site_archiver={},warn", level))?
        }
    };
    Ok(filter)
}
