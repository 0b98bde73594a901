// src/scanner/classify.rs
// =============================================================================
// This module decides what a single URL found in an HTML attribute means.
//
// Every candidate ends up in exactly one bucket:
// - InsecureResource: an image/frame/media reference loaded over plain http://
// - InScopeLink: an anchor pointing at another page on the same site
// - Rejected: anything else, with a reason we can inspect in tests and logs
//
// Rejections are NOT errors. Most attributes on a page are rejected and that
// is completely normal (anchors, CDN links over https, mailto: links...).
//
// Both functions are pure: same (base, candidate) in, same answer out.
// The crawler relies on this to deduplicate URLs.
// =============================================================================

use std::fmt;

use url::{ParseError, Url};

/// The outcome of classifying one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Absolute `http://` resource reference (normalized).
    InsecureResource(String),
    /// Same-site page to crawl next (absolute, normalized).
    InScopeLink(String),
    /// Not interesting for the crawl.
    Rejected(Rejection),
}

/// Why a candidate URL was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// In-page anchor such as `#section`
    Anchor,
    /// The value could not be parsed or resolved as a URL
    Malformed,
    /// Points at a different host
    OffHost,
    /// Resource is already loaded over https
    SecureScheme,
    /// Relative or `//host/...` resource: it inherits the page's scheme
    InheritedScheme,
    /// `mailto:`, `javascript:`, `data:` and friends
    UnsupportedScheme,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Anchor => "anchor",
            Rejection::Malformed => "malformed",
            Rejection::OffHost => "off-host",
            Rejection::SecureScheme => "secure-scheme",
            Rejection::InheritedScheme => "inherited-scheme",
            Rejection::UnsupportedScheme => "unsupported-scheme",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A candidate after resolution, remembering whether it was written as an
// absolute URL (with its own scheme) or had to be joined with the base.
enum Reference {
    Absolute(Url),
    Relative(Url),
}

// Parses the candidate on its own first. The url crate reports
// RelativeUrlWithoutBase for both "/path" and "//host/path", which are
// exactly the cases we resolve against the page URL (RFC 3986 rules).
fn resolve(base: &Url, raw: &str) -> Result<Reference, Rejection> {
    match Url::parse(raw) {
        Ok(url) => Ok(Reference::Absolute(url)),
        Err(ParseError::RelativeUrlWithoutBase) => base
            .join(raw)
            .map(Reference::Relative)
            .map_err(|_| Rejection::Malformed),
        Err(_) => Err(Rejection::Malformed),
    }
}

/// Classifies the value of a resource attribute (`src`, `poster`, `data`).
///
/// Only references that spell out `http://` themselves are insecure.
/// Relative references load over whatever scheme the page uses.
pub fn classify_resource(base: &Url, raw: &str) -> Classification {
    match resolve(base, raw) {
        Err(rejection) => Classification::Rejected(rejection),
        Ok(Reference::Relative(_)) => Classification::Rejected(Rejection::InheritedScheme),
        Ok(Reference::Absolute(url)) => match url.scheme() {
            "http" => Classification::InsecureResource(normalize(&url)),
            "https" => Classification::Rejected(Rejection::SecureScheme),
            _ => Classification::Rejected(Rejection::UnsupportedScheme),
        },
    }
}

/// Classifies the `href` of an anchor.
///
/// Examples (base = "https://www.example.com/docs/"):
///   "#top"                      -> Rejected(Anchor)
///   "intro/"                    -> InScopeLink("https://www.example.com/docs/intro")
///   "https://example.com/blog"  -> InScopeLink("https://example.com/blog")
///   "https://other.org/"        -> Rejected(OffHost)
pub fn classify_link(base: &Url, raw: &str) -> Classification {
    if raw.trim_start().starts_with('#') {
        return Classification::Rejected(Rejection::Anchor);
    }

    let url = match resolve(base, raw) {
        Ok(Reference::Absolute(url)) | Ok(Reference::Relative(url)) => url,
        Err(rejection) => return Classification::Rejected(rejection),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Classification::Rejected(Rejection::UnsupportedScheme);
    }

    if !same_site(base, &url) {
        return Classification::Rejected(Rejection::OffHost);
    }

    Classification::InScopeLink(normalize(&url))
}

/// Serializes a URL and strips one trailing slash so that
/// "https://example.com/page/" and "https://example.com/page" are the same key.
pub fn normalize(url: &Url) -> String {
    let serialized = url.as_str();
    serialized
        .strip_suffix('/')
        .unwrap_or(serialized)
        .to_string()
}

/// True when both URLs live on the same host, treating "www.example.com" and
/// "example.com" as one site. Explicit ports must match too.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(left), Some(right)) => {
            strip_www(left).eq_ignore_ascii_case(strip_www(right)) && a.port() == b.port()
        }
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_relative_link_resolves_against_base() {
        let result = classify_link(&base("https://example.com/a/"), "/img.png");
        assert_eq!(
            result,
            Classification::InScopeLink("https://example.com/img.png".to_string())
        );
    }

    #[test]
    fn test_path_relative_link_merges_with_base_path() {
        let result = classify_link(&base("https://example.com/docs/intro"), "setup/?step=1");
        assert_eq!(
            result,
            Classification::InScopeLink("https://example.com/docs/setup/?step=1".to_string())
        );
    }

    #[test]
    fn test_http_resource_is_insecure() {
        let result = classify_resource(&base("https://example.com"), "http://cdn.example.com/x.jpg");
        assert_eq!(
            result,
            Classification::InsecureResource("http://cdn.example.com/x.jpg".to_string())
        );
    }

    #[test]
    fn test_https_resource_is_rejected() {
        let result = classify_resource(&base("https://example.com"), "https://cdn.example.com/x.jpg");
        assert_eq!(result, Classification::Rejected(Rejection::SecureScheme));
    }

    #[test]
    fn test_scheme_relative_and_relative_resources_inherit_scheme() {
        let page = base("https://example.com/gallery/");
        assert_eq!(
            classify_resource(&page, "//cdn.example.com/x.jpg"),
            Classification::Rejected(Rejection::InheritedScheme)
        );
        assert_eq!(
            classify_resource(&page, "thumbs/x.jpg"),
            Classification::Rejected(Rejection::InheritedScheme)
        );
    }

    #[test]
    fn test_data_uri_resource_is_unsupported() {
        let result = classify_resource(&base("https://example.com"), "data:image/png;base64,AAAA");
        assert_eq!(result, Classification::Rejected(Rejection::UnsupportedScheme));
    }

    #[test]
    fn test_malformed_resource() {
        let result = classify_resource(&base("https://example.com"), "http://exa mple.com/x.png");
        assert_eq!(result, Classification::Rejected(Rejection::Malformed));
    }

    #[test]
    fn test_anchor_is_rejected() {
        let result = classify_link(&base("https://www.example.com/page"), "#section");
        assert_eq!(result, Classification::Rejected(Rejection::Anchor));
    }

    #[test]
    fn test_other_host_is_rejected() {
        let result = classify_link(&base("https://example.com"), "http://other.com/page");
        assert_eq!(result, Classification::Rejected(Rejection::OffHost));
    }

    #[test]
    fn test_www_prefix_is_ignored_and_trailing_slash_stripped() {
        let result = classify_link(&base("https://www.example.com"), "https://example.com/page/");
        assert_eq!(
            result,
            Classification::InScopeLink("https://example.com/page".to_string())
        );
    }

    #[test]
    fn test_subdomain_is_off_host() {
        let result = classify_link(&base("https://example.com"), "https://blog.example.com/");
        assert_eq!(result, Classification::Rejected(Rejection::OffHost));
    }

    #[test]
    fn test_different_port_is_off_host() {
        let result = classify_link(&base("https://example.com"), "https://example.com:8443/admin");
        assert_eq!(result, Classification::Rejected(Rejection::OffHost));
    }

    #[test]
    fn test_mailto_and_javascript_links_are_unsupported() {
        let page = base("https://example.com");
        assert_eq!(
            classify_link(&page, "mailto:team@example.com"),
            Classification::Rejected(Rejection::UnsupportedScheme)
        );
        assert_eq!(
            classify_link(&page, "javascript:void(0)"),
            Classification::Rejected(Rejection::UnsupportedScheme)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let page = base("https://www.example.com/a/b");
        for raw in ["../c/", "#x", "http://example.com/d", "//example.com/e/"] {
            assert_eq!(classify_link(&page, raw), classify_link(&page, raw));
            assert_eq!(classify_resource(&page, raw), classify_resource(&page, raw));
        }
    }

    #[test]
    fn test_normalize_strips_a_single_slash() {
        assert_eq!(normalize(&base("https://example.com/")), "https://example.com");
        assert_eq!(normalize(&base("https://example.com/a//")), "https://example.com/a/");
    }
}
