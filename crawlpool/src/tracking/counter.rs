//! Thread-safe accumulators.

use std::sync::atomic::{AtomicI64, Ordering};

/// Tracks the number of times something has happened.
///
/// Implementations must be safe to share between workers, and a `size` that
/// happens after an `add` (for example across a channel hand-off) must see it.
pub trait Counter: Send + Sync {
    /// Adds `delta` to the running total. Negative values are allowed.
    fn add(&self, delta: i64);

    /// Returns the running total.
    fn size(&self) -> i64;
}

/// Default [`Counter`] backed by a single atomic.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    n: AtomicI64,
}

impl AtomicCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for AtomicCounter {
    fn add(&self, delta: i64) {
        self.n.fetch_add(delta, Ordering::AcqRel);
    }

    fn size(&self) -> i64 {
        self.n.load(Ordering::Acquire)
    }
}
