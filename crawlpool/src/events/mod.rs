//! Lifecycle events and the hooks observing them.

mod registry;

pub use registry::{EventRegistry, Hook, HookId};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that happens to a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    /// `start` was called; workers are not spawned yet.
    Start,
    /// `stop` was called; workers have not been signalled yet.
    Stop,
    /// `wait` was called; workers may still be running.
    Wait,
    /// Every worker acknowledged it is running.
    Started,
    /// Every worker consumed its stop signal.
    Stopped,
    /// A worker accepted a request and is about to call the network.
    Request,
    /// A worker is about to deliver a response to the queue.
    Response,
}

impl Event {
    /// All events, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Start,
        Self::Started,
        Self::Request,
        Self::Response,
        Self::Stop,
        Self::Stopped,
        Self::Wait,
    ];

    /// The wire name of the event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Wait => "wait",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Request => "request",
            Self::Response => "response",
        }
    }

    /// Whether the event belongs to the pool lifecycle rather than one item.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, Self::Request | Self::Response)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown event: {s}"))
    }
}
