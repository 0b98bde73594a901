// src/report.rs
// =============================================================================
// What the user sees.
//
// Findings are printed the moment a page has been scanned, one per line:
//   text: https://example.com/page: http://cdn.example.com/logo.png
//   json: {"page":"https://example.com/page","resource":"http://cdn.example.com/logo.png"}
//
// When the crawl ends we print a summary with every visited URL.
// Findings go to stdout; logs go to stderr, so `--json` output stays clean.
// =============================================================================

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::crawl::CrawlReport;

/// One insecure resource reference on one page.
///
/// Not deduplicated across pages: the same image on two pages is two findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub page: String,
    pub resource: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.page, self.resource)
    }
}

// The final JSON object. Borrows from the report so nothing is cloned.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    visited: &'a [String],
    pages_fetched: usize,
    pages_failed: usize,
    abandoned: usize,
    findings: usize,
}

pub fn format_finding(finding: &Finding, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(finding)?)
    } else {
        Ok(finding.to_string())
    }
}

pub fn print_finding(finding: &Finding, json: bool) -> Result<()> {
    println!("{}", format_finding(finding, json)?);
    Ok(())
}

pub fn format_summary(report: &CrawlReport, findings: usize, json: bool) -> Result<String> {
    if json {
        let summary = Summary {
            visited: &report.visited,
            pages_fetched: report.pages_fetched,
            pages_failed: report.pages_failed,
            abandoned: report.abandoned,
            findings,
        };
        return Ok(serde_json::to_string(&summary)?);
    }

    let mut out = String::new();
    out.push_str("-----\n");
    out.push_str(&format!("Visited {} page(s):\n", report.visited.len()));
    for url in &report.visited {
        out.push_str(&format!("   {}\n", url));
    }
    out.push('\n');
    out.push_str("📊 Summary:\n");
    out.push_str(&format!("   📄 Fetched: {}\n", report.pages_fetched));
    out.push_str(&format!("   ⚠️  Failed: {}\n", report.pages_failed));
    if report.abandoned > 0 {
        out.push_str(&format!("   ⏱️  Still running at exit: {}\n", report.abandoned));
    }
    out.push_str(&format!("   🔓 Insecure resources: {}", findings));

    Ok(out)
}

pub fn print_summary(report: &CrawlReport, findings: usize, json: bool) -> Result<()> {
    println!("{}", format_summary(report, findings, json)?);
    Ok(())
}
