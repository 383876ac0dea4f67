//! Log subscriber setup for binaries embedding the guard

use crate::config::LoggingConfig;
use crate::error::{GuardError, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            GuardError::ConfigError(format!("invalid log level {:?}: {}", config.level, e))
        }),
    }
}

/// Install the global tracing subscriber
///
/// Fails if a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| GuardError::ConfigError(format!("logging already initialized: {}", e)))
}
