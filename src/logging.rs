//! Tracing setup and rate-limited error reporting.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, trace};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber.
///
/// `level` is used when `RUST_LOG` is unset; verbosity bumps it (1 = debug, 2+ = trace).
pub fn init_logging(level: &str, verbosity: u8, format: LogFormat) -> Result<()> {
    let level = match verbosity {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fishcast={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Remembers which failures were already reported.
///
/// Failures that can repeat every tick are reported once at error level, then only traced.
#[derive(Debug, Default, Clone)]
pub struct LogOnce {
    seen: HashSet<String>,
}

impl LogOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a failure identified by `key`; returns `true` the first time.
    pub fn error(&mut self, key: &str, message: &str) -> bool {
        if self.seen.insert(key.to_string()) {
            error!(key, "{message}");
            true
        } else {
            trace!(key, "{message}");
            false
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_once_reports_first_failure_only() {
        let mut once = LogOnce::new();
        assert!(once.error("pool:snapshot", "boom"));
        assert!(!once.error("pool:snapshot", "boom"));
        assert!(once.error("pool:undo", "boom"));
        once.clear();
        assert!(once.error("pool:snapshot", "boom"));
    }
}
