//! The boundary between a pool and its caller.
//!
//! The caller pushes [`Request`]s and pops [`Response`]s; workers do the
//! opposite. Both directions are bounded, so a caller that stops draining
//! responses eventually stalls every worker on its outbound push, and stalled
//! workers stop pulling requests. That is the only flow control the pool has.

use crate::errors::{CrawlerError, Result};
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Two bounded FIFO channels: inbound work and outbound results.
///
/// The `pop_*` methods must be cancel-safe: workers race `pop_request`
/// against the stop signal, and an item must not be lost when the stop
/// signal wins.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueues work, waiting while the inbound channel is full.
    async fn push_request(&self, request: Request) -> Result<()>;

    /// Dequeues work. Returns `None` once the channel is closed and empty.
    async fn pop_request(&self) -> Option<Request>;

    /// Delivers a result, waiting while the outbound channel is full.
    async fn push_response(&self, response: Response) -> Result<()>;

    /// Takes the next result. Returns `None` once closed and empty.
    async fn pop_response(&self) -> Option<Response>;

    /// Takes a result if one is ready.
    fn try_pop_response(&self) -> Option<Response>;

    /// Items waiting in the inbound channel.
    fn request_len(&self) -> usize;

    /// Items waiting in the outbound channel.
    fn response_len(&self) -> usize;
}

/// Default [`Queue`] built on tokio bounded channels.
///
/// Receivers sit behind async mutexes so any number of workers (or caller
/// tasks) can pull from the same end.
#[derive(Debug)]
pub struct BoundedQueue {
    request_tx: mpsc::Sender<Request>,
    request_rx: Arc<Mutex<mpsc::Receiver<Request>>>,
    response_tx: mpsc::Sender<Response>,
    response_rx: Arc<Mutex<mpsc::Receiver<Response>>>,
}

impl BoundedQueue {
    /// Creates a queue with the given capacities. Both must be at least 1.
    pub fn new(request_capacity: usize, response_capacity: usize) -> Result<Self> {
        if request_capacity == 0 || response_capacity == 0 {
            return Err(CrawlerError::Config(format!(
                "queue capacities must be positive (request={request_capacity}, response={response_capacity})"
            )));
        }

        let (request_tx, request_rx) = mpsc::channel(request_capacity);
        let (response_tx, response_rx) = mpsc::channel(response_capacity);

        Ok(Self {
            request_tx,
            request_rx: Arc::new(Mutex::new(request_rx)),
            response_tx,
            response_rx: Arc::new(Mutex::new(response_rx)),
        })
    }

    /// Capacity of the inbound channel.
    #[must_use]
    pub fn request_capacity(&self) -> usize {
        self.request_tx.max_capacity()
    }

    /// Capacity of the outbound channel.
    #[must_use]
    pub fn response_capacity(&self) -> usize {
        self.response_tx.max_capacity()
    }
}

#[async_trait]
impl Queue for BoundedQueue {
    async fn push_request(&self, request: Request) -> Result<()> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| CrawlerError::QueueClosed("request"))
    }

    async fn pop_request(&self) -> Option<Request> {
        self.request_rx.lock().await.recv().await
    }

    async fn push_response(&self, response: Response) -> Result<()> {
        self.response_tx
            .send(response)
            .await
            .map_err(|_| CrawlerError::QueueClosed("response"))
    }

    async fn pop_response(&self) -> Option<Response> {
        self.response_rx.lock().await.recv().await
    }

    fn try_pop_response(&self) -> Option<Response> {
        self.response_rx.try_lock().ok()?.try_recv().ok()
    }

    fn request_len(&self) -> usize {
        self.request_tx.max_capacity() - self.request_tx.capacity()
    }

    fn response_len(&self) -> usize {
        self.response_tx.max_capacity() - self.response_tx.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_ok};

    fn request(n: usize) -> Request {
        Request::get(format!("http://example.com/{n}")).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(BoundedQueue::new(0, 1).is_err());
        assert!(BoundedQueue::new(1, 0).is_err());
    }

    #[tokio::test]
    async fn test_requests_are_fifo() {
        let queue = BoundedQueue::new(4, 4).unwrap();
        for n in 0..3 {
            queue.push_request(request(n)).await.unwrap();
        }
        assert_eq!(queue.request_len(), 3);

        for n in 0..3 {
            let popped = queue.pop_request().await.unwrap();
            assert_eq!(popped.target(), format!("http://example.com/{n}"));
        }
        assert_eq!(queue.request_len(), 0);
    }

    #[tokio::test]
    async fn test_full_request_channel_blocks_sender() {
        let queue = BoundedQueue::new(1, 1).unwrap();
        queue.push_request(request(0)).await.unwrap();

        let mut push = tokio_test::task::spawn(queue.push_request(request(1)));
        assert_pending!(push.poll());

        queue.pop_request().await.unwrap();
        assert!(push.is_woken());
        assert_ready_ok!(push.poll());
        drop(push);
        assert_eq!(queue.request_len(), 1);
    }

    #[tokio::test]
    async fn test_response_len_and_try_pop() {
        let queue = BoundedQueue::new(1, 2).unwrap();
        assert!(queue.try_pop_response().is_none());

        let response = Response::new(request(0), Duration::ZERO, Ok(Default::default()));
        queue.push_response(response).await.unwrap();
        assert_eq!(queue.response_len(), 1);

        assert!(queue.try_pop_response().is_some());
        assert_eq!(queue.response_len(), 0);
        assert_eq!(queue.response_capacity(), 2);
    }
}
