//! Logging bootstrap
//!
//! Binaries call [`init_logging`] once at startup. Libraries only emit
//! `tracing` events and never install a subscriber themselves.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Failure to install the global subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured filter directive could not be parsed
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber was already installed
    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Build the filter: `RUST_LOG` when set, otherwise the configured directive.
pub fn build_filter(configured: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(configured)
            .map_err(|e| LoggingError::InvalidFilter(format!("{configured}: {e}"))),
    }
}

/// Install the global fmt subscriber.
///
/// # Errors
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_logging(filter: &str, json: bool) -> Result<(), LoggingError> {
    let filter = build_filter(filter)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if json { builder.json().try_init() } else { builder.try_init() };

    result.map_err(|_| LoggingError::AlreadyInitialized)
}
