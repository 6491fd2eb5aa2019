//! Outbound call descriptions.

use crate::cancellation::CancellationToken;
use crate::errors::{CrawlerError, Result, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A unit of work for the pool: one HTTP call to make.
///
/// The target is kept as the caller wrote it. It is only resolved into an
/// absolute URL by the fetcher, so a relative or scheme-less target is not a
/// construction error but a transport error carried in the response.
#[derive(Clone)]
pub struct Request {
    id: Uuid,
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
    cancel: Option<Arc<CancellationToken>>,
}

impl Request {
    /// Creates a request. An empty method means `GET`.
    ///
    /// Fails when the method is not a valid token or the target contains
    /// control characters or whitespace.
    pub fn new(method: &str, target: impl Into<String>) -> Result<Self> {
        let method = if method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(method.as_bytes())
                .map_err(|_| CrawlerError::InvalidMethod(method.to_string()))?
        };

        let target = target.into();
        if let Some(c) = target.chars().find(|c| c.is_control()) {
            return Err(CrawlerError::invalid_target(
                target.clone(),
                format!("invalid control character {c:?} in URL"),
            ));
        }
        if target.contains(char::is_whitespace) {
            return Err(CrawlerError::invalid_target(target.clone(), "contains whitespace"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            method,
            target,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            cancel: None,
        })
    }

    /// Creates a `GET` request.
    pub fn get(target: impl Into<String>) -> Result<Self> {
        Self::new("GET", target)
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CrawlerError::invalid_header(name, e.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| CrawlerError::invalid_header(name, e.to_string()))?;
        self.headers.append(header_name, header_value);
        Ok(self)
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a per-request timeout, overriding the client default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Unique id of this request.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target exactly as given.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Extra headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Per-request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The attached cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&Arc<CancellationToken>> {
        self.cancel.as_ref()
    }

    /// Resolves the target into an absolute `http`/`https` URL.
    pub fn url(&self) -> Result<Url, TransportError> {
        let url = Url::parse(&self.target).map_err(|e| TransportError::InvalidUrl {
            method: self.method.to_string(),
            target: self.target.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(TransportError::UnsupportedScheme {
                method: self.method.to_string(),
                target: self.target.clone(),
                scheme: scheme.to_string(),
            }),
        }
    }

    /// Builds the underlying `reqwest` request for `client`.
    pub fn to_transport(&self, client: &reqwest::Client) -> Result<reqwest::Request, TransportError> {
        let mut builder = client
            .request(self.method.clone(), self.url()?)
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(|e| TransportError::Request {
            method: self.method.to_string(),
            target: self.target.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)
    }
}
