// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Submodules:
// - fetch: downloads one page (certificate checks disabled)
// - registry: remembers which URLs were already admitted
// - scheduler: the concurrent crawl loop that ties it all together
//
// Features:
// - One async task per page, optionally capped
// - Same-site restriction ("www." is ignored when comparing hosts)
// - Deterministic termination: the crawl stops when no task is left running
// =============================================================================

mod fetch;
mod registry;
mod scheduler;

pub use fetch::HttpFetcher;
pub use scheduler::{CrawlConfig, CrawlReport, Crawler, Termination};
