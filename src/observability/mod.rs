//! # Observability
//!
//! Structured logging for the binary. The library only emits `tracing`
//! events; installing a subscriber is left to whoever embeds it.

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
