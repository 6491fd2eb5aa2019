//! Outcome envelopes produced by workers.

use super::{FetchResult, Request};
use crate::crawler::Crawler;
use crate::errors::TransportError;
use std::time::Duration;

/// The result of processing one [`Request`].
///
/// Exactly one of `page` and `error` is normally set, but a custom
/// [`ResponseFactory`] is free to build any combination.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    page: Option<FetchResult>,
    error: Option<TransportError>,
    took: Duration,
}

impl Response {
    /// Builds a response from a fetch outcome.
    #[must_use]
    pub fn new(request: Request, took: Duration, outcome: Result<FetchResult, TransportError>) -> Self {
        let (page, error) = match outcome {
            Ok(page) => (Some(page), None),
            Err(error) => (None, Some(error)),
        };
        Self::from_parts(request, took, page, error)
    }

    /// Builds a response from its raw parts.
    #[must_use]
    pub fn from_parts(
        request: Request,
        took: Duration,
        page: Option<FetchResult>,
        error: Option<TransportError>,
    ) -> Self {
        Self {
            request,
            page,
            error,
            took,
        }
    }

    /// The request that produced this response.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The fetched page, absent when the call failed.
    #[must_use]
    pub fn page(&self) -> Option<&FetchResult> {
        self.page.as_ref()
    }

    /// The transport error, if the call failed.
    #[must_use]
    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// Wall-clock time the network call took.
    #[must_use]
    pub fn took(&self) -> Duration {
        self.took
    }

    /// HTTP status, when a page was fetched.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.page.as_ref().map(|p| p.status_code)
    }

    /// Splits the response into its request and page.
    #[must_use]
    pub fn into_parts(self) -> (Request, Option<FetchResult>, Option<TransportError>) {
        (self.request, self.page, self.error)
    }
}

/// Builds the [`Response`] for each processed request.
///
/// Replace it with [`CrawlerBuilder::with_response_factory`] to attach extra
/// data or to synthesize outcomes in tests.
///
/// [`CrawlerBuilder::with_response_factory`]: crate::crawler::CrawlerBuilder::with_response_factory
pub trait ResponseFactory: Send + Sync {
    /// Combines a request, the elapsed time and the fetch outcome.
    fn build(
        &self,
        crawler: &Crawler,
        took: Duration,
        request: Request,
        outcome: Result<FetchResult, TransportError>,
    ) -> Response;
}

impl<F> ResponseFactory for F
where
    F: Fn(&Crawler, Duration, Request, Result<FetchResult, TransportError>) -> Response + Send + Sync,
{
    fn build(
        &self,
        crawler: &Crawler,
        took: Duration,
        request: Request,
        outcome: Result<FetchResult, TransportError>,
    ) -> Response {
        self(crawler, took, request, outcome)
    }
}

/// The factory used unless one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn build(
        &self,
        _crawler: &Crawler,
        took: Duration,
        request: Request,
        outcome: Result<FetchResult, TransportError>,
    ) -> Response {
        Response::new(request, took, outcome)
    }
}
