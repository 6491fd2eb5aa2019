//! Request accounting.
//!
//! A [`Tracker`] groups the [`Counter`]s the pool bumps as items move through
//! a worker. Both are traits so a caller can swap in counters that also
//! export metrics elsewhere.

mod counter;
mod tracker;

pub use counter::{AtomicCounter, Counter};
pub use tracker::{BaseTracker, Tracker, TrackerSnapshot};
