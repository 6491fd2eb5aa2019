//! The network call a worker performs for each request.

use super::Request;
use crate::errors::TransportError;
use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::trace;

/// Raw outcome of a successful network call.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers (non UTF-8 values are skipped).
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
}

impl FetchResult {
    /// Creates a result with a status and body, as test fetchers do.
    #[must_use]
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            body: body.into(),
            ..Default::default()
        }
    }

    /// Whether the response is HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Transport used by workers.
///
/// Implementations are shared by every worker, so they must be safe for
/// concurrent use. Errors are returned, never panicked: the pool stores them
/// in the response and keeps going.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the call described by `request`.
    async fn fetch(&self, request: &Request) -> Result<FetchResult, TransportError>;
}

/// Default [`Fetcher`] on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn execute(&self, request: &Request) -> Result<FetchResult, TransportError> {
        let transport = request.to_transport(&self.client)?;
        let response = self
            .client
            .execute(transport)
            .await
            .map_err(|e| transport_error(request, &e))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let content_type = headers.get("content-type").cloned();

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(request, &e))?;

        trace!(target_url = %final_url, status_code, bytes = body.len(), "Fetched");

        Ok(FetchResult {
            status_code,
            headers,
            body: body.to_vec(),
            final_url,
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResult, TransportError> {
        let Some(token) = request.cancellation() else {
            return self.execute(request).await;
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Err(TransportError::Cancelled {
                method: request.method().to_string(),
                target: request.target().to_string(),
                reason: token.reason().unwrap_or_default(),
            }),
            result = self.execute(request) => result,
        }
    }
}

fn transport_error(request: &Request, err: &reqwest::Error) -> TransportError {
    let method = request.method().to_string();
    let target = request.target().to_string();

    if err.is_timeout() {
        TransportError::Timeout { method, target }
    } else if err.is_connect() {
        TransportError::Connect {
            method,
            target,
            reason: error_chain(err),
        }
    } else {
        TransportError::Request {
            method,
            target,
            reason: error_chain(err),
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::testing::TestServer;
    use std::sync::Arc;

    #[test]
    fn test_fetch_result_is_html() {
        let html = FetchResult {
            content_type: Some("text/html; charset=utf-8".to_string()),
            ..FetchResult::new(200, "<html></html>")
        };
        assert!(html.is_html());
        assert!(html.is_success());

        let json = FetchResult {
            content_type: Some("application/json".to_string()),
            ..html.clone()
        };
        assert!(!json.is_html());
    }

    #[test]
    fn test_fetch_result_text_is_lossy() {
        let result = FetchResult::new(404, vec![b'o', b'k', 0xff]);
        assert!(!result.is_success());
        assert_eq!(result.text(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_fetch_relative_target_is_transport_error() {
        let fetcher = ReqwestFetcher::new(reqwest::Client::new());
        let request = Request::get("invalid").unwrap();

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_url");
    }

    #[tokio::test]
    async fn test_fetch_against_local_server() {
        let server = TestServer::start().await.unwrap();
        let fetcher = ReqwestFetcher::new(reqwest::Client::new());
        let request = Request::get(server.url("/")).unwrap();

        let result = fetcher.fetch(&request).await.unwrap();
        assert_eq!(result.status_code, 200);
        assert!(result.is_html());
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_fetch_cancelled_before_call() {
        let token = Arc::new(CancellationToken::new());
        token.cancel("caller gave up");
        let fetcher = ReqwestFetcher::new(reqwest::Client::new());
        let request = Request::get("http://127.0.0.1:9/")
            .unwrap()
            .with_cancellation(token);

        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("caller gave up"));
    }
}
