// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first crawling from one or more seed URLs
// - Same-site restriction (other sites are recorded, never crawled)
// - Configurable depth limit
// - Polite crawling with a delay after every page
// - Optional pool of workers sharing one frontier
//
// Submodules:
// - frontier:    FIFO queue + visited/queued marks
// - coordinator: probe, render, persist and expand one page
// - engine:      the `crawl` entry point and the worker loop
// =============================================================================

mod coordinator;
mod engine;
mod frontier;

#[cfg(test)]
mod tests;

pub use coordinator::{CoordinatorSettings, FetchCoordinator};
pub use engine::{crawl, CrawlState, CrawlSummary, Crawler};
pub use frontier::{CrawlTask, Frontier, FrontierState, Offer, VisitedSet};
