// src/urls/mod.rs
// =============================================================================
// Pure URL logic: no I/O happens in this module.
//
// Submodules:
// - normalize: canonical form used as the dedup key
// - taxonomy:  URL -> output directory and file names
// - classify:  which discovered links become crawl tasks
// =============================================================================

mod classify;
mod normalize;
mod taxonomy;

pub use classify::{is_image_asset, LinkClassifier, Verdict};
pub use normalize::{NormalizedUrl, UrlNormalizer};
pub use taxonomy::{image_file_name, output_location, sanitize_segment, OutputLocation};
