// src/scanner/page.rs
// =============================================================================
// This module scans one fetched page.
//
// Input: the page URL and its HTML (as a token stream or a body stream)
// Output: two deduplicated sets
//   - insecure resource URLs found on the page
//   - same-site links to crawl next
//
// Which tags matter:
//   resource tags: <img>, <iframe>, <frame>, <object>, <embed>, <video>,
//                  <audio>, <source>, <track>
//   link tags:     <a>
//
// Only the attributes that really load something are inspected:
//   - "data" on <object>
//   - "src" and "poster" on any resource tag
//   - "href" on <a>
// Everything else (alt, class, width...) is ignored.
// =============================================================================

use std::collections::BTreeSet;
use std::fmt::Display;

use futures::{Stream, StreamExt};
use tracing::{trace, warn};
use url::Url;

use super::classify::{classify_link, classify_resource, Classification};
use super::tokens::{tokenize, Tag, Token};

/// What one page contributed to the crawl.
///
/// BTreeSet deduplicates and gives a stable order for output and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub resources: BTreeSet<String>,
    pub links: BTreeSet<String>,
}

/// Scans a token stream in document order.
pub fn scan_tokens<I>(base: &Url, tokens: I) -> PageScan
where
    I: IntoIterator<Item = Token>,
{
    let mut scan = PageScan::default();

    for token in tokens {
        match token {
            Token::StartTag(tag) | Token::SelfClosingTag(tag) if is_resource_tag(&tag.name) => {
                collect_resources(base, &tag, &mut scan.resources);
            }
            Token::StartTag(tag) if tag.name == "a" => {
                collect_link(base, &tag, &mut scan.links);
            }
            other => trace!(token = %other, "token skipped"),
        }
    }

    scan
}

/// Tokenizes and scans an HTML document.
pub fn scan_html(base: &Url, html: &str) -> PageScan {
    scan_tokens(base, tokenize(html))
}

/// Drains a response body stream and scans what arrived.
///
/// A read error part way through is not fatal: we stop reading and scan the
/// partial page. The stream is consumed (and therefore closed) here.
pub async fn scan_body<S, B, E>(base: &Url, mut body: S) -> PageScan
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut buffer = Vec::new();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => buffer.extend_from_slice(bytes.as_ref()),
            Err(e) => {
                warn!(page = %base, error = %e, "body stream failed, scanning partial page");
                break;
            }
        }
    }

    let html = String::from_utf8_lossy(&buffer);
    scan_html(base, &html)
}

fn is_resource_tag(name: &str) -> bool {
    matches!(
        name,
        "img" | "iframe" | "frame" | "object" | "embed" | "video" | "audio" | "source" | "track"
    )
}

fn is_targeted_resource_attribute(tag: &str, attribute: &str) -> bool {
    (tag == "object" && attribute == "data") || attribute == "src" || attribute == "poster"
}

// Each targeted attribute is judged on its own, so a <video> with an http://
// src and an http:// poster reports both.
fn collect_resources(base: &Url, tag: &Tag, resources: &mut BTreeSet<String>) {
    for (key, value) in &tag.attrs {
        if !is_targeted_resource_attribute(&tag.name, key) {
            continue;
        }

        match classify_resource(base, value) {
            Classification::InsecureResource(url) => {
                resources.insert(url);
            }
            Classification::Rejected(reason) => {
                trace!(tag = %tag.name, attribute = %key, value = %value, %reason, "resource skipped");
            }
            Classification::InScopeLink(_) => {}
        }
    }
}

fn collect_link(base: &Url, tag: &Tag, links: &mut BTreeSet<String>) {
    let Some(href) = tag.attr("href") else {
        return;
    };

    match classify_link(base, href) {
        Classification::InScopeLink(url) => {
            links.insert(url);
        }
        Classification::Rejected(reason) => {
            trace!(href = %href, %reason, "link skipped");
        }
        Classification::InsecureResource(_) => {}
    }
}
