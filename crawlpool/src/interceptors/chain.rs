//! Interceptor chain for ordered, veto-capable hooks.

use crate::crawler::Crawler;
use crate::errors::Veto;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for per-item interceptors.
///
/// Both stages default to letting the item through. Returning a [`Veto`]
/// abandons the item: nothing downstream of the vetoing stage runs for it.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Called when a worker takes a request from the queue, before any
    /// counter is touched or the network is called.
    async fn before_request(&self, _worker: usize, _crawler: &Crawler, _request: &Request) -> Result<(), Veto> {
        Ok(())
    }

    /// Called after the network call, before the response is counted and
    /// delivered.
    async fn before_response(&self, _worker: usize, _crawler: &Crawler, _response: &Response) -> Result<(), Veto> {
        Ok(())
    }
}

/// Adapts a closure into a request-stage [`Interceptor`].
pub struct RequestFn<F>(pub F);

#[async_trait]
impl<F> Interceptor for RequestFn<F>
where
    F: Fn(usize, &Crawler, &Request) -> Result<(), Veto> + Send + Sync,
{
    async fn before_request(&self, worker: usize, crawler: &Crawler, request: &Request) -> Result<(), Veto> {
        (self.0)(worker, crawler, request)
    }
}

/// Adapts a closure into a response-stage [`Interceptor`].
pub struct ResponseFn<F>(pub F);

#[async_trait]
impl<F> Interceptor for ResponseFn<F>
where
    F: Fn(usize, &Crawler, &Response) -> Result<(), Veto> + Send + Sync,
{
    async fn before_response(&self, worker: usize, crawler: &Crawler, response: &Response) -> Result<(), Veto> {
        (self.0)(worker, crawler, response)
    }
}

/// An ordered list of interceptors.
///
/// Registration order is execution order for both stages. Cloning is cheap
/// and is how the pool snapshots the chain before running it.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Creates a new empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor.
    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Runs the request stage; stops at the first veto.
    pub async fn run_before_request(&self, worker: usize, crawler: &Crawler, request: &Request) -> Result<(), Veto> {
        for interceptor in &self.interceptors {
            interceptor.before_request(worker, crawler, request).await?;
        }
        Ok(())
    }

    /// Runs the response stage; stops at the first veto.
    pub async fn run_before_response(&self, worker: usize, crawler: &Crawler, response: &Response) -> Result<(), Veto> {
        for interceptor in &self.interceptors {
            interceptor.before_response(worker, crawler, response).await?;
        }
        Ok(())
    }

    /// Returns the number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn crawler() -> Crawler {
        Crawler::builder(1)
            .with_fetcher(Arc::new(MockFetcher::ok()))
            .build()
            .unwrap()
    }

    fn request() -> Request {
        Request::get("http://example.com").unwrap()
    }

    #[tokio::test]
    async fn test_chain_creation() {
        let chain = InterceptorChain::new();
        assert!(chain.is_empty());
        assert!(chain.run_before_request(0, &crawler(), &request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_chain_runs_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut chain = InterceptorChain::new();
        for n in [10, 5, 15] {
            let calls = calls.clone();
            chain.add(Arc::new(RequestFn(move |_: usize, _: &Crawler, _: &Request| {
                calls.lock().push(n);
                Ok(())
            })));
        }

        chain.run_before_request(0, &crawler(), &request()).await.unwrap();
        assert_eq!(*calls.lock(), vec![10, 5, 15]);
    }

    #[tokio::test]
    async fn test_chain_short_circuits_on_veto() {
        let reached = Arc::new(Mutex::new(false));
        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(RequestFn(|_: usize, _: &Crawler, _: &Request| Err(Veto::new("blocked")))));
        {
            let reached = reached.clone();
            chain.add(Arc::new(RequestFn(move |_: usize, _: &Crawler, _: &Request| {
                *reached.lock() = true;
                Ok(())
            })));
        }

        let veto = chain.run_before_request(0, &crawler(), &request()).await.unwrap_err();
        assert_eq!(veto.reason, "blocked");
        assert!(!*reached.lock());
    }

    #[tokio::test]
    async fn test_stages_are_independent() {
        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(ResponseFn(|_: usize, _: &Crawler, _: &Response| Err(Veto::new("no")))));

        let crawler = crawler();
        assert!(chain.run_before_request(0, &crawler, &request()).await.is_ok());

        let response = Response::new(request(), Duration::ZERO, Ok(Default::default()));
        assert!(chain.run_before_response(0, &crawler, &response).await.is_err());
    }
}
