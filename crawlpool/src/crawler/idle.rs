//! Stopping a pool once it has gone quiet.
//!
//! A crawl that feeds discovered links back into its own queue has no
//! natural end. The supervisor samples the tracker once per tick and stops
//! the pool after `count` consecutive ticks in which neither the request nor
//! the response counter moved and both queues are empty.

use super::Crawler;
use crate::events::{Event, HookId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Runs an idle supervisor and waits for the pool's workers to exit.
///
/// Returns roughly `count * tick` after traffic last moved, or sooner if the
/// pool is stopped by someone else. A pool that is not running returns at
/// once, queued work or not.
pub async fn wait_until_idle(crawler: &Crawler, count: usize, tick: Duration) {
    let supervisor = IdleSupervisor::spawn(crawler.clone(), count, tick);
    crawler.wait().await;
    supervisor.join().await;
}

/// Handle to a background idle supervisor.
///
/// The supervisor listens for the pool's `stop` event through a `once` hook.
/// The hook is registered before `spawn` returns and is removed when the
/// supervisor ends or is aborted.
#[derive(Debug)]
pub struct IdleSupervisor {
    crawler: Crawler,
    stop_hook: HookId,
    handle: JoinHandle<()>,
}

impl IdleSupervisor {
    /// Starts supervising `crawler` on the current runtime.
    ///
    /// The supervisor ends on its own once the pool is not running.
    #[must_use]
    pub fn spawn(crawler: Crawler, count: usize, tick: Duration) -> Self {
        let stopped = Arc::new(Notify::new());
        let stop_hook = {
            let stopped = stopped.clone();
            crawler.once(Event::Stop, move |_, _| stopped.notify_one())
        };

        let handle = {
            let crawler = crawler.clone();
            tokio::spawn(async move {
                supervise(&crawler, &stopped, count, tick).await;
                crawler.off(Event::Stop, stop_hook);
            })
        };

        Self {
            crawler,
            stop_hook,
            handle,
        }
    }

    /// Whether the supervisor has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops supervising and unregisters the `stop` hook. The pool keeps
    /// running, unless the supervisor was in the middle of stopping it.
    pub fn abort(&self) {
        self.handle.abort();
        self.crawler.off(Event::Stop, self.stop_hook);
    }

    /// Waits for the supervisor to end.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}

async fn supervise(crawler: &Crawler, stopped: &Notify, count: usize, tick: Duration) {
    let mut idle_ticks = 0;
    loop {
        if !crawler.is_started() {
            debug!(crawler = crawler.name(), "Pool not running, supervisor exiting");
            return;
        }

        let before = progress(crawler);
        tokio::select! {
            biased;
            () = stopped.notified() => {
                debug!(crawler = crawler.name(), "Pool stopped elsewhere, supervisor exiting");
                return;
            }
            () = tokio::time::sleep(tick) => {}
        }

        if progress(crawler) == before {
            idle_ticks += 1;
        } else {
            idle_ticks = 0;
        }

        let drained = crawler.queue().request_len() == 0 && crawler.queue().response_len() == 0;
        if idle_ticks >= count && drained {
            info!(crawler = crawler.name(), idle_ticks, "Pool idle, stopping");
            crawler.stop().await;
            return;
        }
    }
}

fn progress(crawler: &Crawler) -> (i64, i64) {
    let tracker = crawler.tracker();
    (tracker.requests().size(), tracker.responses().size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    fn crawler() -> Crawler {
        Crawler::builder(2)
            .with_fetcher(Arc::new(MockFetcher::ok()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_idle_pool_stops_after_count_ticks() {
        let crawler = crawler();
        assert!(crawler.start().await);
        crawler
            .queue()
            .push_request(crate::http::Request::get("http://example.com").unwrap())
            .await
            .unwrap();
        crawler.queue().pop_response().await.unwrap();

        let started = Instant::now();
        wait_until_idle(&crawler, 2, Duration::from_millis(250)).await;
        let elapsed = started.elapsed();

        assert!(!crawler.is_started());
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(900), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_external_stop_ends_supervisor() {
        let crawler = crawler();
        crawler.start().await;

        let supervisor = IdleSupervisor::spawn(crawler.clone(), 100, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(crawler.stop().await);

        tokio::time::timeout(Duration::from_secs(1), supervisor.join())
            .await
            .expect("supervisor should exit on stop");
        crawler.wait().await;
    }

    #[tokio::test]
    async fn test_undrained_responses_keep_pool_alive() {
        let crawler = Crawler::builder(1)
            .with_fetcher(Arc::new(MockFetcher::ok()))
            .with_capacities(1, 1)
            .build()
            .unwrap();
        crawler.start().await;
        crawler
            .queue()
            .push_request(crate::http::Request::get("http://example.com").unwrap())
            .await
            .unwrap();

        let supervisor = IdleSupervisor::spawn(crawler.clone(), 1, Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!supervisor.is_finished());
        assert!(crawler.is_started());

        crawler.queue().pop_response().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), supervisor.join())
            .await
            .expect("supervisor should stop the drained pool");
        assert!(!crawler.is_started());
        crawler.wait().await;
    }

    #[tokio::test]
    async fn test_stop_before_supervisor_is_polled() {
        let crawler = crawler();
        crawler.start().await;

        let supervisor = IdleSupervisor::spawn(crawler.clone(), 100, Duration::from_secs(10));
        assert!(crawler.stop().await);

        tokio::time::timeout(Duration::from_secs(1), supervisor.join())
            .await
            .expect("supervisor should see the stop");
        crawler.wait().await;
        assert_eq!(crawler.events().len(Event::Stop), 0);
    }

    #[tokio::test]
    async fn test_wait_until_idle_returns_for_unstarted_pool_with_pending_work() {
        let crawler = crawler();
        crawler
            .queue()
            .push_request(crate::http::Request::get("http://example.com").unwrap())
            .await
            .unwrap();

        tokio::time::timeout(
            Duration::from_secs(1),
            wait_until_idle(&crawler, 1, Duration::from_millis(10)),
        )
        .await
        .expect("a pool that is not running has nothing to wait for");

        assert_eq!(crawler.queue().request_len(), 1);
        assert_eq!(crawler.events().len(Event::Stop), 0);
    }

    #[tokio::test]
    async fn test_aborted_supervisors_leave_no_hooks() {
        let crawler = crawler();
        crawler.start().await;

        for _ in 0..3 {
            let supervisor = IdleSupervisor::spawn(crawler.clone(), 100, Duration::from_secs(10));
            assert_eq!(crawler.events().len(Event::Stop), 1);
            supervisor.abort();
            supervisor.join().await;
        }
        assert_eq!(crawler.events().len(Event::Stop), 0);

        crawler.stop().await;
        crawler.wait().await;
    }
}
