// src/crawl/registry.rs
// =============================================================================
// The set of URLs this crawl has already taken responsibility for.
//
// The one rule: a URL is fetched at most once. `mark_visited` is a single
// insert-if-absent on a concurrent set, so when many callers race on the same
// URL exactly one of them gets `true`. No `contains` method: a separate
// check followed by an insert would let two callers both see the URL as new.
//
// The registry lives for one crawl and only ever grows.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashSet;

#[derive(Debug, Default)]
pub struct VisitedRegistry {
    visited: DashSet<String>,
    completed: AtomicUsize,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the caller is the first to claim `url`.
    pub fn mark_visited(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Records that one admitted URL finished its fetch and scan.
    pub fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn admitted(&self) -> usize {
        self.visited.len()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Every admitted URL, sorted.
    pub fn snapshot(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().map(|url| url.key().clone()).collect();
        urls.sort();
        urls
    }
}
