//! The worker pool.
//!
//! A [`Crawler`] owns a fixed number of workers. Each worker pulls a
//! [`Request`](crate::http::Request) from the inbound queue, runs the
//! pre-request interceptors, performs the call, builds a
//! [`Response`](crate::http::Response), runs the pre-response interceptors
//! and pushes the response to the outbound queue.
//!
//! ```rust,ignore
//! let crawler = Crawler::builder(5).with_default_log().build()?;
//! crawler.start().await;
//! crawler.queue().push_request(Request::get("https://example.com")?).await?;
//! let response = crawler.queue().pop_response().await;
//! crawler.stop().await;
//! crawler.wait().await;
//! ```

mod builder;
mod idle;
mod pool;
mod worker;


pub use builder::CrawlerBuilder;
pub use idle::{wait_until_idle, IdleSupervisor};
pub use pool::Crawler;
