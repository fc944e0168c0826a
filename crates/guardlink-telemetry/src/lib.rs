//! # guardlink-telemetry
//!
//! Subscriber setup for the `tracing` events every GuardLink crate emits.
//!
//! - [`init_logging`]: process-wide stderr subscriber, compact or JSON
//! - [`capture_logs`]: thread-scoped in-memory capture for tests

#![deny(unsafe_code)]

pub mod capture;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};

use guardlink_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors from subscriber initialisation.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },
}

/// Resolve the filter: `RUST_LOG` when set and valid, else `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| TelemetryError::InvalidFilter {
        directive: level.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. Call once at startup.
///
/// Output goes to stderr so stdout stays free for command results.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), TelemetryError> {
    let filter = build_filter(&settings.level)?;

    let result = if settings.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}
