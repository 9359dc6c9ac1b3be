//! Log subscriber setup.
//!
//! `RUST_LOG` overrides the configured filter.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Subscriber installation errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install log subscriber: {0}")]
    Init(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Build the filter: `RUST_LOG` if set and valid, else the configured one.
pub fn filter(logging: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&logging.filter)?),
    }
}

/// Install the global subscriber.
///
/// Fails if one is already installed.
pub fn init(logging: &LoggingConfig) -> Result<(), TelemetryError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(logging)?)
        .with_target(true);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(TelemetryError::Init)
}
