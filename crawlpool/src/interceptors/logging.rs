//! Interceptor that logs every item passing through a worker.

use super::Interceptor;
use crate::crawler::Crawler;
use crate::errors::{duration_ms, Veto};
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

type RequestFormat = Arc<dyn Fn(usize, &Crawler, &Request) -> String + Send + Sync>;
type ResponseFormat = Arc<dyn Fn(usize, &Crawler, &Response) -> String + Send + Sync>;

/// Logs `<worker>:request:<target>` and
/// `<worker>:response:<target>:err:<error>` lines at info level.
///
/// Never vetoes. Either line can be replaced with a custom formatter.
#[derive(Clone)]
pub struct LoggingInterceptor {
    request_format: Option<RequestFormat>,
    response_format: Option<ResponseFormat>,
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self {
            request_format: Some(Arc::new(default_request_line)),
            response_format: Some(Arc::new(default_response_line)),
        }
    }
}

impl LoggingInterceptor {
    /// Logs both stages with the default format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs only requests.
    #[must_use]
    pub fn requests_only() -> Self {
        Self {
            response_format: None,
            ..Self::default()
        }
    }

    /// Logs only responses.
    #[must_use]
    pub fn responses_only() -> Self {
        Self {
            request_format: None,
            ..Self::default()
        }
    }

    /// Replaces the request line.
    #[must_use]
    pub fn with_request_format<F>(mut self, format: F) -> Self
    where
        F: Fn(usize, &Crawler, &Request) -> String + Send + Sync + 'static,
    {
        self.request_format = Some(Arc::new(format));
        self
    }

    /// Replaces the response line.
    #[must_use]
    pub fn with_response_format<F>(mut self, format: F) -> Self
    where
        F: Fn(usize, &Crawler, &Response) -> String + Send + Sync + 'static,
    {
        self.response_format = Some(Arc::new(format));
        self
    }
}

fn default_request_line(worker: usize, _crawler: &Crawler, request: &Request) -> String {
    format!("{worker}:request:{}", request.target())
}

fn default_response_line(worker: usize, _crawler: &Crawler, response: &Response) -> String {
    let error = response.error().map(ToString::to_string).unwrap_or_default();
    format!("{worker}:response:{}:err:{error}", response.request().target())
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn before_request(&self, worker: usize, crawler: &Crawler, request: &Request) -> Result<(), Veto> {
        if let Some(format) = &self.request_format {
            info!(crawler = crawler.name(), request_id = %request.id(), "{}", format(worker, crawler, request));
        }
        Ok(())
    }

    async fn before_response(&self, worker: usize, crawler: &Crawler, response: &Response) -> Result<(), Veto> {
        if let Some(format) = &self.response_format {
            info!(
                crawler = crawler.name(),
                request_id = %response.request().id(),
                took_ms = duration_ms(response.took()),
                "{}",
                format(worker, crawler, response)
            );
        }
        Ok(())
    }
}
