//! # Crawlpool
//!
//! A bounded worker-pool HTTP crawler.
//!
//! A fixed number of workers pull [`Request`](http::Request)s from an inbound
//! queue, perform the call and push [`Response`](http::Response)s to an
//! outbound queue. Around that loop the pool offers:
//!
//! - **Lifecycle control**: `start`, `stop` and `wait`, each firing events
//! - **Interceptors**: ordered, veto-capable checks before each call and before
//!   each delivery
//! - **Accounting**: request, response, error and dropped counters
//! - **Idle detection**: a supervisor that stops the pool once traffic is flat
//! - **Backpressure**: both queues are bounded end to end
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crawlpool::prelude::*;
//!
//! let crawler = Crawler::builder(5).with_default_log().build()?;
//! crawler.start().await;
//! crawler.queue().push_request(Request::get("https://example.com")?).await?;
//!
//! let response = crawler.queue().pop_response().await;
//! wait_until_idle(&crawler, 3, Duration::from_secs(1)).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod crawler;
pub mod errors;
pub mod events;
pub mod http;
pub mod interceptors;
pub mod logging;
pub mod queue;
pub mod testing;
pub mod tracking;

#[cfg(feature = "html")]
pub mod collect;

pub use crawler::{Crawler, CrawlerBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{CrawlerConfig, HttpConfig};
    pub use crate::crawler::{wait_until_idle, Crawler, CrawlerBuilder, IdleSupervisor};
    pub use crate::errors::{CrawlerError, Result, TransportError, Veto};
    pub use crate::events::{Event, EventRegistry, Hook, HookId};
    pub use crate::http::{FetchResult, Fetcher, Request, Response, ResponseFactory};
    pub use crate::interceptors::{Interceptor, InterceptorChain, LoggingInterceptor};
    pub use crate::logging::LogConfig;
    pub use crate::queue::{BoundedQueue, Queue};
    pub use crate::tracking::{BaseTracker, Counter, Tracker, TrackerSnapshot};

    #[cfg(feature = "html")]
    pub use crate::collect::{AttributeCollector, PageParser};
}
