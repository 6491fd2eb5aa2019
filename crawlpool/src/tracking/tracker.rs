//! Aggregate request/response counters.

use super::{AtomicCounter, Counter};
use serde::{Deserialize, Serialize};

/// Tracks how many items a pool has issued, completed, failed and dropped.
///
/// Counters are bumped independently, so their relation only holds once the
/// pool is quiesced: `responses + dropped == requests`.
pub trait Tracker: Send + Sync {
    /// Requests that passed the pre-request interceptors.
    fn requests(&self) -> &dyn Counter;

    /// Responses delivered to the outbound queue.
    fn responses(&self) -> &dyn Counter;

    /// Delivered responses whose network call failed.
    fn errors(&self) -> &dyn Counter;

    /// Items vetoed by a pre-response interceptor.
    fn dropped(&self) -> &dyn Counter;

    /// Reads every counter into a plain value.
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            requests: self.requests().size(),
            responses: self.responses().size(),
            errors: self.errors().size(),
            dropped: self.dropped().size(),
        }
    }
}

/// Default [`Tracker`] made of [`AtomicCounter`]s.
#[derive(Debug, Default)]
pub struct BaseTracker {
    requests: AtomicCounter,
    responses: AtomicCounter,
    errors: AtomicCounter,
    dropped: AtomicCounter,
}

impl BaseTracker {
    /// Creates a tracker with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracker for BaseTracker {
    fn requests(&self) -> &dyn Counter {
        &self.requests
    }

    fn responses(&self) -> &dyn Counter {
        &self.responses
    }

    fn errors(&self) -> &dyn Counter {
        &self.errors
    }

    fn dropped(&self) -> &dyn Counter {
        &self.dropped
    }
}

/// Point-in-time copy of a tracker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Requests issued.
    pub requests: i64,
    /// Responses delivered.
    pub responses: i64,
    /// Transport errors among delivered responses.
    pub errors: i64,
    /// Items dropped by response interceptors.
    pub dropped: i64,
}

impl TrackerSnapshot {
    /// Items issued but neither delivered nor dropped yet.
    #[must_use]
    pub fn in_flight(&self) -> i64 {
        self.requests - self.responses - self.dropped
    }

    /// Converts the snapshot to a JSON value.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": self.requests,
            "responses": self.responses,
            "errors": self.errors,
            "dropped": self.dropped,
        })
    }
}
