// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is one required positional argument, the HTTPS address to start
// from, plus a few optional knobs for large sites. What clap cannot check
// for us (an absolute https:// URL) is checked in `validate_start_url`
// before any crawling begins. The url crate already refuses https:// URLs
// without a host.
// =============================================================================

use std::num::NonZeroUsize;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::crawl::{CrawlConfig, Termination};

#[derive(Parser, Debug)]
#[command(
    name = "mixed-content-scout",
    version,
    about = "Crawl an HTTPS website and report resources loaded over plain HTTP",
    long_about = "mixed-content-scout starts at the given page, follows links within the same site \
                  and prints every image, frame, video, audio or object that is loaded over http:// \
                  (\"mixed content\"). Certificate errors are ignored so misconfigured sites can be inspected."
)]
pub struct Cli {
    /// HTTPS address of the site, e.g. https://example.com
    pub start_url: String,

    /// Output findings and the summary as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Maximum number of pages fetched at the same time (default: no limit)
    #[arg(long)]
    pub max_concurrency: Option<NonZeroUsize>,

    /// Capacity of the work queue (default: unbounded)
    #[arg(long)]
    pub queue_capacity: Option<NonZeroUsize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// How often the scheduler checks on the crawl, in milliseconds
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// When to consider the crawl finished
    #[arg(long, value_enum, default_value_t = Termination::OutstandingTasks)]
    pub termination: Termination,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_concurrency: self.max_concurrency,
            queue_capacity: self.queue_capacity,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            termination: self.termination,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Problems with the start URL. These stop the program before it crawls.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("invalid start URL '{url}': {source}")]
    Unparseable {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("start URL must use https, e.g. https://example.com (got '{0}')")]
    NotHttps(String),
}

pub fn validate_start_url(raw: &str) -> Result<Url, UsageError> {
    let url = Url::parse(raw).map_err(|source| UsageError::Unparseable {
        url: raw.to_string(),
        source,
    })?;

    if url.scheme() != "https" {
        return Err(UsageError::NotHttps(raw.to_string()));
    }

    Ok(url)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<NonZeroUsize>?
//    - Option: the flag may be absent, meaning "no limit"
//    - NonZeroUsize: a limit of 0 would mean nothing can ever run
//    - clap parses it with FromStr, so "--max-concurrency 0" is rejected for us
//
// 2. What does value_parser!(u64).range(1..) do?
//    - Parses the flag as u64 and rejects values below 1
//    - A zero poll interval would make the scheduler's timer spin
//
// 3. Why validate the URL ourselves?
//    - clap only knows "this is a string"
//    - We need an absolute https:// URL before crawling
//    - thiserror gives each problem its own variant and message
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_start_url_is_an_error() {
        assert!(Cli::try_parse_from(["mixed-content-scout"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mixed-content-scout", "https://example.com"]).unwrap();
        let config = cli.crawl_config();

        assert!(!cli.json);
        assert_eq!(cli.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.queue_capacity, None);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.termination, Termination::OutstandingTasks);
    }

    #[test]
    fn test_flags_map_into_config() {
        let cli = Cli::try_parse_from([
            "mixed-content-scout",
            "https://example.com",
            "--json",
            "--max-concurrency",
            "8",
            "--queue-capacity",
            "128",
            "--poll-interval-ms",
            "500",
            "--termination",
            "idle-intervals",
        ])
        .unwrap();
        let config = cli.crawl_config();

        assert!(cli.json);
        assert_eq!(config.max_concurrency, NonZeroUsize::new(8));
        assert_eq!(config.queue_capacity, NonZeroUsize::new(128));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.termination, Termination::IdleIntervals);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let result = Cli::try_parse_from([
            "mixed-content-scout",
            "https://example.com",
            "--max-concurrency",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_start_url() {
        let url = validate_start_url("https://example.com/start").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_http_start_url_is_rejected() {
        assert!(matches!(
            validate_start_url("http://example.com"),
            Err(UsageError::NotHttps(_))
        ));
    }

    #[test]
    fn test_relative_start_url_is_rejected() {
        assert!(matches!(
            validate_start_url("example.com"),
            Err(UsageError::Unparseable { .. })
        ));
    }
}
