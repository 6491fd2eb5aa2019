//! Ordered construction of a [`Crawler`].

use super::pool::{Crawler, Parts};
use crate::config::CrawlerConfig;
use crate::errors::Result;
use crate::events::{Event, EventRegistry, Hook};
use crate::http::{DefaultResponseFactory, Fetcher, ReqwestFetcher, ResponseFactory};
use crate::interceptors::{Interceptor, InterceptorChain, LoggingInterceptor};
use crate::queue::{BoundedQueue, Queue};
use crate::tracking::{BaseTracker, Tracker};
use std::sync::Arc;
use tracing::info;

/// Builder for [`Crawler`].
///
/// Options apply in call order; for settings that hold one value the last
/// call wins, hooks and interceptors accumulate.
///
/// ```rust,ignore
/// let crawler = Crawler::builder(5)
///     .with_name("docs")
///     .with_default_log()
///     .build()?;
/// ```
#[must_use]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    client: Option<reqwest::Client>,
    fetcher: Option<Arc<dyn Fetcher>>,
    tracker: Option<Arc<dyn Tracker>>,
    queue: Option<Arc<dyn Queue>>,
    factory: Option<Arc<dyn ResponseFactory>>,
    hooks: Vec<(Event, Hook)>,
    interceptors: InterceptorChain,
}

impl CrawlerBuilder {
    /// Creates a builder for `size` workers with default settings.
    pub fn new(size: usize) -> Self {
        Self {
            config: CrawlerConfig::new(size),
            client: None,
            fetcher: None,
            tracker: None,
            queue: None,
            factory: None,
            hooks: Vec::new(),
            interceptors: InterceptorChain::new(),
        }
    }

    /// Replaces the plain-data settings, pool size included.
    pub fn with_config(mut self, config: CrawlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of workers.
    pub fn with_size(mut self, size: usize) -> Self {
        self.config.size = size;
        self
    }

    /// Sets the name used in logs and spans.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the capacities of the default queue.
    pub fn with_capacities(mut self, request: usize, response: usize) -> Self {
        self.config = self.config.with_capacities(request, response);
        self
    }

    /// Uses `client` for the default fetcher instead of building one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Replaces the transport entirely.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replaces the counters.
    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Replaces the queue. Capacities are then ignored.
    pub fn with_queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Replaces how responses are built.
    pub fn with_response_factory(mut self, factory: impl ResponseFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Registers a hook for `event`.
    pub fn with_hook<F>(mut self, event: Event, hook: F) -> Self
    where
        F: Fn(Event, &Crawler) + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(hook);
        self.hooks.push((event, hook));
        self
    }

    /// Appends an interceptor.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.add(interceptor);
        self
    }

    /// Logs `<worker>:request:<target>` before each call.
    pub fn with_default_request_log(self) -> Self {
        self.with_interceptor(Arc::new(LoggingInterceptor::requests_only()))
    }

    /// Logs `<worker>:response:<target>:err:<error>` before each delivery.
    pub fn with_default_response_log(self) -> Self {
        self.with_interceptor(Arc::new(LoggingInterceptor::responses_only()))
    }

    /// Logs the name of `event` each time it fires.
    pub fn with_event_log(self, event: Event) -> Self {
        self.with_hook(event, |event, crawler| info!(crawler = crawler.name(), "{event}"))
    }

    /// Logs every item and every lifecycle event.
    pub fn with_default_log(self) -> Self {
        let builder = self.with_interceptor(Arc::new(LoggingInterceptor::new()));
        Event::ALL
            .into_iter()
            .filter(Event::is_lifecycle)
            .fold(builder, Self::with_event_log)
    }

    /// Validates the settings and assembles the pool.
    pub fn build(self) -> Result<Crawler> {
        self.config.validate()?;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let client = match self.client {
                    Some(client) => client,
                    None => self.config.build_client()?,
                };
                Arc::new(ReqwestFetcher::new(client))
            }
        };

        let queue: Arc<dyn Queue> = match self.queue {
            Some(queue) => queue,
            None => Arc::new(BoundedQueue::new(
                self.config.request_capacity(),
                self.config.response_capacity(),
            )?),
        };

        let events = EventRegistry::new();
        for (event, hook) in self.hooks {
            events.on(event, hook);
        }

        Ok(Crawler::from_parts(Parts {
            name: self.config.name,
            size: self.config.size,
            tracker: self.tracker.unwrap_or_else(|| Arc::new(BaseTracker::new())),
            queue,
            fetcher,
            factory: self.factory.unwrap_or_else(|| Arc::new(DefaultResponseFactory)),
            events,
            interceptors: self.interceptors,
        }))
    }
}

impl std::fmt::Debug for CrawlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlerBuilder")
            .field("config", &self.config)
            .field("custom_fetcher", &self.fetcher.is_some())
            .field("hooks", &self.hooks.len())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
