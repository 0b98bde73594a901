// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (stderr) and parse command-line arguments
// 2. Validate the start URL (must be https://)
// 3. Run the crawl, printing each insecure resource as soon as it is found
// 4. Print the summary of visited pages
// 5. Exit with proper code (0 = crawl completed, 2 = usage or internal error)
// =============================================================================

mod cli;
mod crawl;
mod report;
mod scanner;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use crawl::{Crawler, HttpFetcher};

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so stdout only carries the report. RUST_LOG overrides
// the default level, e.g. RUST_LOG=mixed_content_scout=debug
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// Returns:
//   Ok(0) = crawl completed (whether or not insecure resources were found)
//   Ok(2) = bad start URL, nothing was crawled
//   Err   = unexpected error
async fn run() -> Result<i32> {
    // Missing arguments are handled by clap, which prints usage and exits 2
    let cli = Cli::parse();

    let seed = match cli::validate_start_url(&cli.start_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(2);
        }
    };

    let fetcher = HttpFetcher::new(cli.timeout()).context("could not set up the HTTP client")?;
    let config = cli.crawl_config();
    info!(
        start = %seed,
        max_concurrency = ?config.max_concurrency,
        queue_capacity = ?config.queue_capacity,
        termination = ?config.termination,
        "scanning website"
    );

    let crawler = Crawler::new(fetcher, config);
    let (findings_tx, mut findings_rx) = mpsc::unbounded_channel();

    // Print findings while the crawl runs, in this same task
    let crawling = crawler.crawl(&seed, findings_tx);
    tokio::pin!(crawling);

    let mut findings = 0;
    let crawl_report = loop {
        tokio::select! {
            done = &mut crawling => break done,
            Some(finding) = findings_rx.recv() => {
                report::print_finding(&finding, cli.json)?;
                findings += 1;
            }
        }
    };

    // Tasks abandoned by the idle-interval policy may still be running;
    // stop accepting from them and flush what is already queued.
    findings_rx.close();
    while let Ok(finding) = findings_rx.try_recv() {
        report::print_finding(&finding, cli.json)?;
        findings += 1;
    }

    report::print_summary(&crawl_report, findings, cli.json)?;

    Ok(0)
}
