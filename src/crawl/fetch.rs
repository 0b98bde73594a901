// src/crawl/fetch.rs
// =============================================================================
// Downloads one page.
//
// The whole point of this tool is to inspect sites that may be misconfigured,
// so certificate validation is switched off: a self-signed or expired cert
// should not stop us from finding mixed content on the page behind it.
//
// HTTP status codes are not failures here. A 404 page can still embed an
// http:// image, so we hand back the body whatever the status was. Only
// transport-level problems (DNS, refused connection, timeout) are errors.
//
// The fetcher sits behind a trait so the scheduler can be tested against an
// in-memory site.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// A response body, chunk by chunk. Whoever holds it owns the connection;
/// dropping the stream closes it.
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, FetchError>>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: BoxError,
    },
}

#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    /// Performs one retrieval and returns the open body stream.
    async fn fetch(&self, url: &str) -> Result<BodyStream, FetchError>;
}

/// The real fetcher, backed by a shared reqwest client (connection pooling).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<BodyStream, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "non-success status, scanning body anyway");
        }

        let url = url.to_string();
        let body = response.bytes_stream().map(move |chunk| {
            chunk.map(|bytes| bytes.to_vec()).map_err(|e| FetchError::Body {
                url: url.clone(),
                source: Box::new(e),
            })
        });

        Ok(body.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(body: BodyStream) -> String {
        let chunks: Vec<_> = body.collect().await;
        let bytes: Vec<u8> = chunks.into_iter().flat_map(|chunk| chunk.unwrap()).collect();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<img src="http://a.test/x.png">"#)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch(&server.url()).await.unwrap();

        assert_eq!(read_all(body).await, r#"<img src="http://a.test/x.png">"#);
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone")
            .with_status(404)
            .with_body("<p>not here</p>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/gone", server.url()))
            .await
            .unwrap();

        assert_eq!(read_all(body).await, "<p>not here</p>");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        // Port 1 on loopback: nothing listens there
        let result = fetcher.fetch("http://127.0.0.1:1/").await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
