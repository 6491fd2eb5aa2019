//! Testing utilities for crawlpool.
//!
//! This module provides:
//! - A mock fetcher with scripted outcomes
//! - A local HTTP server for end-to-end crawls

mod mocks;
mod server;

pub use mocks::MockFetcher;
pub use server::TestServer;
