//! Logging configuration and initialization.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration.
///
/// `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `crawlpool=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format: `pretty` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "pretty".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LogConfig {
    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = "json".into();
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Installs the global subscriber. Panics if one is already installed.
    pub fn init(&self) {
        match self.format.as_str() {
            "json" => fmt().json().with_env_filter(self.filter()).init(),
            _ => fmt().with_env_filter(self.filter()).init(),
        }
    }

    /// Installs the global subscriber, failing if one is already installed.
    pub fn try_init(&self) -> anyhow::Result<()> {
        let result = match self.format.as_str() {
            "json" => fmt().json().with_env_filter(self.filter()).try_init(),
            _ => fmt().with_env_filter(self.filter()).try_init(),
        };
        result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
    }
}
