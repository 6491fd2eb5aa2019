//! Mock fetchers for testing.

use crate::errors::TransportError;
use crate::http::{FetchResult, Fetcher, Request};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// A [`Fetcher`] that never touches the network.
///
/// Scripted outcomes are returned first, in order; once they run out every
/// call gets the fallback. Calls with latency honour the request's
/// cancellation token.
#[derive(Debug)]
pub struct MockFetcher {
    scripted: Mutex<VecDeque<Result<FetchResult, TransportError>>>,
    fallback: Result<FetchResult, TransportError>,
    latency: Option<Duration>,
    targets: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Answers every call with a 200 HTML page.
    #[must_use]
    pub fn ok() -> Self {
        Self::with_fallback(Ok(FetchResult {
            content_type: Some("text/html; charset=utf-8".to_string()),
            ..FetchResult::new(200, "<html><body>ok</body></html>")
        }))
    }

    /// Fails every call with `error`.
    #[must_use]
    pub fn failing(error: TransportError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<FetchResult, TransportError>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            fallback,
            latency: None,
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Queues an outcome ahead of the fallback.
    #[must_use]
    pub fn then(self, outcome: Result<FetchResult, TransportError>) -> Self {
        self.scripted.lock().push_back(outcome);
        self
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.targets.lock().len()
    }

    /// Targets of every call, in call order.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().clone()
    }

    fn next_outcome(&self, request: &Request) -> Result<FetchResult, TransportError> {
        let outcome = self
            .scripted
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        outcome.map(|page| FetchResult {
            final_url: if page.final_url.is_empty() {
                request.target().to_string()
            } else {
                page.final_url
            },
            ..page
        })
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> Result<FetchResult, TransportError> {
        self.targets.lock().push(request.target().to_string());

        if let Some(latency) = self.latency {
            match request.cancellation() {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            return Err(TransportError::Cancelled {
                                method: request.method().to_string(),
                                target: request.target().to_string(),
                                reason: token.reason().unwrap_or_default(),
                            });
                        }
                        () = tokio::time::sleep(latency) => {}
                    }
                }
                None => tokio::time::sleep(latency).await,
            }
        }

        self.next_outcome(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_outcomes_then_fallback() {
        let error = TransportError::Timeout {
            method: "GET".into(),
            target: "a".into(),
        };
        let fetcher = MockFetcher::ok().then(Err(error.clone()));
        let request = Request::get("http://example.com/a").unwrap();

        assert_eq!(fetcher.fetch(&request).await.unwrap_err(), error);
        let page = fetcher.fetch(&request).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert_eq!(page.final_url, "http://example.com/a");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_fetcher() {
        let error = TransportError::Connect {
            method: "GET".into(),
            target: "x".into(),
            reason: "refused".into(),
        };
        let fetcher = MockFetcher::failing(error);
        let request = Request::get("x").unwrap();
        assert_eq!(fetcher.fetch(&request).await.unwrap_err().kind(), "connect");
        assert_eq!(fetcher.targets(), vec!["x".to_string()]);
    }
}
