//! # Structured Logging
//!
//! Installs a `tracing_subscriber` fmt layer filtered by `RUST_LOG`, either
//! human readable or one JSON object per line.
//!
//! Tokens and AWS keys never appear in events: they are carried as
//! [`SecretString`](crate::secrets::SecretString), whose `Debug` and
//! `Display` output is redacted.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit JSON lines instead of the compact text format
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl LoggingConfig {
    pub fn new(verbose: bool, json_logging: bool) -> Self {
        let log_level = if verbose { "debug" } else { "info" };
        Self { log_level: log_level.to_string(), json_logging }
    }

    /// `RUST_LOG` if set and parseable, otherwise the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (e.g. by a test
/// harness); the existing one is kept.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = if config.json_logging {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(level = %config.log_level, json = config.json_logging, "Logging initialised");
    }
    installed
}
