//! Plain-data configuration for a pool.

use crate::errors::{CrawlerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Crawler`](crate::Crawler).
///
/// Queue capacities default to the pool size, so a caller can enqueue one
/// request per worker ahead and workers can park one result each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Inbound queue capacity. Defaults to `size`.
    #[serde(default)]
    pub request_capacity: Option<usize>,
    /// Outbound queue capacity. Defaults to `size`.
    #[serde(default)]
    pub response_capacity: Option<usize>,
    /// Name used in logs and spans.
    #[serde(default = "default_name")]
    pub name: String,
    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_size() -> usize {
    5
}

fn default_name() -> String {
    "crawler".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            request_capacity: None,
            response_capacity: None,
            name: default_name(),
            http: HttpConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Creates a configuration for `size` workers.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Sets the number of workers.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets both queue capacities.
    #[must_use]
    pub fn with_capacities(mut self, request: usize, response: usize) -> Self {
        self.request_capacity = Some(request);
        self.response_capacity = Some(response);
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Effective inbound capacity.
    #[must_use]
    pub fn request_capacity(&self) -> usize {
        self.request_capacity.unwrap_or(self.size)
    }

    /// Effective outbound capacity.
    #[must_use]
    pub fn response_capacity(&self) -> usize {
        self.response_capacity.unwrap_or(self.size)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(CrawlerError::Config("pool size must be at least 1".into()));
        }
        if self.request_capacity() == 0 || self.response_capacity() == 0 {
            return Err(CrawlerError::Config("queue capacities must be at least 1".into()));
        }
        self.http.validate()
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the shared HTTP client, tuned for this pool size.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .user_agent(self.http.user_agent.clone())
            .timeout(self.http.timeout())
            .connect_timeout(self.http.connect_timeout())
            .pool_idle_timeout(self.http.pool_idle_timeout())
            .pool_max_idle_per_host(self.size)
            .redirect(reqwest::redirect::Policy::limited(self.http.max_redirects))
            .build()?;
        Ok(client)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: f64,
    /// How long idle pooled connections are kept, in seconds.
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> f64 {
    30.0
}

fn default_connect_timeout() -> f64 {
    10.0
}

fn default_pool_idle_timeout() -> f64 {
    2.0
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    concat!("crawlpool/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_idle_timeout_seconds: default_pool_idle_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_seconds)
    }

    /// Idle connection timeout as a Duration.
    #[must_use]
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.pool_idle_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("timeout_seconds", self.timeout_seconds),
            ("connect_timeout_seconds", self.connect_timeout_seconds),
            ("pool_idle_timeout_seconds", self.pool_idle_timeout_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CrawlerError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}
