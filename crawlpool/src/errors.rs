//! Error types for the crawlpool crate.
//!
//! Three families, by where they surface:
//! [`CrawlerError`] is returned synchronously to the caller,
//! [`TransportError`] is carried inside a [`Response`](crate::http::Response),
//! and [`Veto`] is what an interceptor returns to drop an item.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Result alias for fallible crawler operations.
pub type Result<T, E = CrawlerError> = std::result::Result<T, E>;

/// The main error type for crawler construction and queue operations.
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// The HTTP method could not be parsed.
    #[error("Invalid method: {0:?}")]
    InvalidMethod(String),

    /// The request target contains characters no URL may carry.
    #[error("Invalid target {target:?}: {reason}")]
    InvalidTarget {
        /// The rejected target.
        target: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header name or value was malformed.
    #[error("Invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A CSS selector could not be parsed.
    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// The rejected selector.
        selector: String,
        /// Parser message.
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A queue endpoint was closed.
    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrawlerError {
    /// Creates an invalid target error.
    #[must_use]
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid header error.
    #[must_use]
    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A failure of the network call itself.
///
/// Transport errors never abort a worker. They are stored in the response and
/// counted by the tracker's `errors` counter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The target could not be turned into an absolute URL.
    #[error("{method} {target:?}: {reason}")]
    InvalidUrl {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
        /// Parser message.
        reason: String,
    },

    /// The URL scheme is not one the fetcher speaks.
    #[error("{method} {target:?}: unsupported protocol scheme {scheme:?}")]
    UnsupportedScheme {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
        /// The offending scheme.
        scheme: String,
    },

    /// Connecting to the remote host failed.
    #[error("{method} {target:?}: connect failed: {reason}")]
    Connect {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
        /// Underlying message.
        reason: String,
    },

    /// The request exceeded its timeout.
    #[error("{method} {target:?}: timed out")]
    Timeout {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
    },

    /// The per-request cancellation token fired.
    #[error("{method} {target:?}: cancelled ({reason})")]
    Cancelled {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
        /// The cancellation reason.
        reason: String,
    },

    /// Any other client-side failure.
    #[error("{method} {target:?}: {reason}")]
    Request {
        /// Request method.
        method: String,
        /// The raw target.
        target: String,
        /// Underlying message.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short machine-friendly kind label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::UnsupportedScheme { .. } => "unsupported_scheme",
            Self::Connect { .. } => "connect",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Request { .. } => "request",
        }
    }

    /// Whether the error came from the per-request cancellation token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Returned by an interceptor to abandon the current item.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("vetoed: {reason}")]
pub struct Veto {
    /// Why the item was rejected.
    pub reason: String,
}

impl Veto {
    /// Creates a new veto.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<&str> for Veto {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for Veto {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

pub(crate) fn duration_ms(took: Duration) -> f64 {
    took.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_message() {
        let err = CrawlerError::invalid_target("a b", "contains whitespace");
        assert_eq!(err.to_string(), "Invalid target \"a b\": contains whitespace");
    }

    #[test]
    fn test_transport_error_kind() {
        let err = TransportError::Timeout {
            method: "GET".into(),
            target: "http://example.com".into(),
        };
        assert_eq!(err.kind(), "timeout");
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "GET \"http://example.com\": timed out");
    }

    #[test]
    fn test_transport_error_to_dict() {
        let err = TransportError::UnsupportedScheme {
            method: "GET".into(),
            target: "ftp://example.com".into(),
            scheme: "ftp".into(),
        };
        let dict = err.to_dict();

        assert_eq!(dict.get("kind").unwrap(), "unsupported_scheme");
        assert!(dict
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("unsupported protocol scheme"));
    }

    #[test]
    fn test_veto_from_str() {
        let veto: Veto = "filtered".into();
        assert_eq!(veto.reason, "filtered");
        assert_eq!(veto.to_string(), "vetoed: filtered");
    }
}
