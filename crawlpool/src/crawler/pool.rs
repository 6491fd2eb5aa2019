//! The pool handle and its start/stop/wait state machine.

use super::builder::CrawlerBuilder;
use super::worker::{self, WorkerChannels};
use crate::errors::Veto;
use crate::events::{Event, EventRegistry, Hook, HookId};
use crate::http::{Fetcher, Request, Response, ResponseFactory};
use crate::interceptors::{Interceptor, InterceptorChain, RequestFn, ResponseFn};
use crate::queue::Queue;
use crate::tracking::Tracker;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

/// A fixed-size pool of workers between an inbound and an outbound queue.
///
/// `Crawler` is a cheap handle: clones share the same pool, which is how
/// hooks, interceptors and supervisors refer back to it.
///
/// Dropping every handle does not stop running workers. Call
/// [`stop`](Self::stop) and [`wait`](Self::wait) to shut the pool down.
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<Inner>,
}

pub(super) struct Parts {
    pub(super) name: String,
    pub(super) size: usize,
    pub(super) tracker: Arc<dyn Tracker>,
    pub(super) queue: Arc<dyn Queue>,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) factory: Arc<dyn ResponseFactory>,
    pub(super) events: EventRegistry,
    pub(super) interceptors: InterceptorChain,
}

struct Inner {
    name: String,
    size: usize,
    tracker: Arc<dyn Tracker>,
    queue: Arc<dyn Queue>,
    fetcher: Arc<dyn Fetcher>,
    factory: Arc<dyn ResponseFactory>,
    events: EventRegistry,
    interceptors: RwLock<InterceptorChain>,
    /// Serializes `start` and `stop`.
    lifecycle: tokio::sync::Mutex<Lifecycle>,
    started: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Channels of the current run. Replaced on every `start`.
#[derive(Default)]
struct Lifecycle {
    stop_tx: Option<watch::Sender<bool>>,
    ack_rx: Option<mpsc::Receiver<usize>>,
}

impl Crawler {
    /// Starts building a pool of `size` workers.
    #[must_use]
    pub fn builder(size: usize) -> CrawlerBuilder {
        CrawlerBuilder::new(size)
    }

    pub(super) fn from_parts(parts: Parts) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: parts.name,
                size: parts.size,
                tracker: parts.tracker,
                queue: parts.queue,
                fetcher: parts.fetcher,
                factory: parts.factory,
                events: parts.events,
                interceptors: RwLock::new(parts.interceptors),
                lifecycle: tokio::sync::Mutex::new(Lifecycle::default()),
                started: AtomicBool::new(false),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Name used in logs and worker spans.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of workers spawned per start.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// The pool's counters.
    #[must_use]
    pub fn tracker(&self) -> &dyn Tracker {
        self.inner.tracker.as_ref()
    }

    /// The pool's inbound and outbound channels.
    #[must_use]
    pub fn queue(&self) -> &dyn Queue {
        self.inner.queue.as_ref()
    }

    /// The pool's hook registry.
    #[must_use]
    pub fn events(&self) -> &EventRegistry {
        &self.inner.events
    }

    /// Whether workers are currently running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Spawns the workers.
    ///
    /// Returns `false` without doing anything if the pool is already started.
    /// Otherwise fires `start`, spawns the workers, waits until each one is
    /// running, fires `started` and returns `true`.
    pub async fn start(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if self.is_started() {
            debug!(crawler = self.name(), "Start ignored, already started");
            return false;
        }

        self.fire(Event::Start);

        let size = self.size();
        let (stop_tx, _) = watch::channel(false);
        let (ready_tx, mut ready_rx) = mpsc::channel(size);
        let (ack_tx, ack_rx) = mpsc::channel(size);

        {
            let mut handles = self.inner.handles.lock();
            for worker in 0..size {
                let channels = WorkerChannels {
                    stop: stop_tx.subscribe(),
                    ready: ready_tx.clone(),
                    ack: ack_tx.clone(),
                };
                let span = info_span!("worker", crawler = %self.name(), worker);
                handles.push(tokio::spawn(worker::run(self.clone(), worker, channels).instrument(span)));
            }
        }
        drop(ready_tx);
        drop(ack_tx);

        for _ in 0..size {
            // None means every worker is gone, which only a panic causes.
            if ready_rx.recv().await.is_none() {
                break;
            }
        }

        lifecycle.stop_tx = Some(stop_tx);
        lifecycle.ack_rx = Some(ack_rx);
        self.inner.started.store(true, Ordering::Release);
        info!(crawler = self.name(), workers = size, "Crawler started");

        self.fire(Event::Started);
        true
    }

    /// Signals every worker to exit.
    ///
    /// Returns `false` if the pool is not started. Otherwise fires `stop`,
    /// waits until each worker has taken its stop signal, fires `stopped` and
    /// returns `true`. A worker busy delivering a response takes its signal
    /// only once the delivery completes, so a stop can wait on the caller
    /// draining the outbound queue. Worker tasks are not joined; use
    /// [`wait`](Self::wait) for that.
    pub async fn stop(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if !self.is_started() {
            debug!(crawler = self.name(), "Stop ignored, not started");
            return false;
        }

        self.fire(Event::Stop);

        if let Some(stop_tx) = lifecycle.stop_tx.take() {
            stop_tx.send_replace(true);
        }
        if let Some(mut ack_rx) = lifecycle.ack_rx.take() {
            for _ in 0..self.size() {
                if ack_rx.recv().await.is_none() {
                    break;
                }
            }
        }

        info!(crawler = self.name(), "Crawler stopped");
        self.fire(Event::Stopped);
        self.inner.started.store(false, Ordering::Release);
        true
    }

    /// Fires `wait`, then blocks until every worker spawned so far has
    /// returned.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of any worker that panicked, which happens when a
    /// hook or interceptor panics.
    pub async fn wait(&self) {
        self.fire(Event::Wait);

        let handles = std::mem::take(&mut *self.inner.handles.lock());
        for result in join_all(handles).await {
            if let Err(err) = result {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }
    }

    /// Registers a hook for every firing of `event`.
    pub fn on_event<F>(&self, event: Event, hook: F) -> HookId
    where
        F: Fn(Event, &Crawler) + Send + Sync + 'static,
    {
        self.inner.events.on(event, Arc::new(hook))
    }

    /// Registers a hook for the next firing of `event` only.
    pub fn once<F>(&self, event: Event, hook: F) -> HookId
    where
        F: Fn(Event, &Crawler) + Send + Sync + 'static,
    {
        self.inner.events.once(event, Arc::new(hook))
    }

    /// Registers an already shared hook.
    pub fn on_event_hook(&self, event: Event, hook: Hook) -> HookId {
        self.inner.events.on(event, hook)
    }

    /// Unregisters a hook. Returns `false` if it was not registered for
    /// `event`.
    pub fn off(&self, event: Event, id: HookId) -> bool {
        self.inner.events.off(event, id)
    }

    /// Appends a pre-request check. Returning a [`Veto`] drops the request
    /// before it is counted or sent.
    pub fn on_request<F>(&self, f: F)
    where
        F: Fn(usize, &Crawler, &Request) -> Result<(), Veto> + Send + Sync + 'static,
    {
        self.intercept(Arc::new(RequestFn(f)));
    }

    /// Appends a pre-response check. Returning a [`Veto`] drops the response
    /// and counts it as dropped.
    pub fn on_response<F>(&self, f: F)
    where
        F: Fn(usize, &Crawler, &Response) -> Result<(), Veto> + Send + Sync + 'static,
    {
        self.intercept(Arc::new(ResponseFn(f)));
    }

    /// Appends an interceptor to the chain.
    pub fn intercept(&self, interceptor: Arc<dyn Interceptor>) {
        self.inner.interceptors.write().add(interceptor);
    }

    /// Copy of the current interceptor chain.
    #[must_use]
    pub fn interceptors(&self) -> InterceptorChain {
        self.inner.interceptors.read().clone()
    }

    pub(super) fn fetcher(&self) -> &dyn Fetcher {
        self.inner.fetcher.as_ref()
    }

    pub(super) fn factory(&self) -> &dyn ResponseFactory {
        self.inner.factory.as_ref()
    }

    pub(super) fn fire(&self, event: Event) {
        self.inner.events.fire(event, self);
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("name", &self.name())
            .field("size", &self.size())
            .field("started", &self.is_started())
            .field("tracker", &self.tracker().snapshot())
            .field("events", &self.inner.events)
            .field("interceptors", &self.inner.interceptors.read().len())
            .finish_non_exhaustive()
    }
}
