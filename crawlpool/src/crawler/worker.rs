//! The loop each worker runs.

use super::Crawler;
use crate::errors::duration_ms;
use crate::events::Event;
use crate::http::Request;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

/// Channels handed to a worker when it is spawned.
pub(super) struct WorkerChannels {
    /// Flips to `true` when the pool is stopped.
    pub(super) stop: watch::Receiver<bool>,
    /// Signalled once the worker is running.
    pub(super) ready: mpsc::Sender<()>,
    /// Carries the worker index once it has taken its stop signal.
    pub(super) ack: mpsc::Sender<usize>,
}

pub(super) async fn run(crawler: Crawler, worker: usize, channels: WorkerChannels) {
    let WorkerChannels { mut stop, ready, ack } = channels;
    // The receiver is dropped only when start itself is gone.
    let _ = ready.send(()).await;
    drop(ready);
    trace!("Worker running");

    loop {
        let request = tokio::select! {
            biased;
            _ = stop.changed() => break,
            request = crawler.queue().pop_request() => request,
        };

        match request {
            Some(request) => process(&crawler, worker, request).await,
            None => {
                debug!("Request queue closed, waiting for stop");
                let _ = stop.changed().await;
                break;
            }
        }
    }

    trace!("Worker stopping");
    let _ = ack.send(worker).await;
}

async fn process(crawler: &Crawler, worker: usize, request: Request) {
    let chain = crawler.interceptors();
    let tracker = crawler.tracker();

    if let Err(veto) = chain.run_before_request(worker, crawler, &request).await {
        debug!(request_id = %request.id(), target = request.target(), reason = %veto.reason, "Request vetoed");
        return;
    }

    tracker.requests().add(1);
    crawler.fire(Event::Request);

    let started = Instant::now();
    let outcome = crawler.fetcher().fetch(&request).await;
    let took = started.elapsed();
    let failed = outcome.is_err();

    let response = crawler.factory().build(crawler, took, request, outcome);

    if let Err(veto) = chain.run_before_response(worker, crawler, &response).await {
        tracker.dropped().add(1);
        debug!(
            request_id = %response.request().id(),
            target = response.request().target(),
            reason = %veto.reason,
            "Response vetoed"
        );
        return;
    }

    tracker.responses().add(1);
    if failed {
        tracker.errors().add(1);
    }
    crawler.fire(Event::Response);

    debug!(
        request_id = %response.request().id(),
        status = response.status(),
        failed,
        took_ms = duration_ms(took),
        "Delivering response"
    );
    if let Err(err) = crawler.queue().push_response(response).await {
        warn!(error = %err, "Response lost");
    }
}
