//! # Observability
//!
//! Structured logging setup for the keybridge broker using the tracing
//! ecosystem. Metrics and distributed tracing backends are a deployment
//! concern layered above this crate.

use crate::config::ObservabilityConfig;
use crate::errors::{KeybridgeError, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The filter honors `RUST_LOG` when set, falling back to the configured
/// log level. Safe to call once per process; a second call fails because
/// the global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| {
        KeybridgeError::config(format!("Failed to install tracing subscriber: {}", e))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Tracing initialized"
    );

    Ok(())
}

/// Filter from the configured log level, independent of the environment.
fn parse_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level)
        .map_err(|e| KeybridgeError::config(format!("Invalid log level: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(parse_filter("not-a-level=").is_err());
    }

    #[test]
    fn test_configured_log_level_accepted() {
        assert!(parse_filter("debug").is_ok());
        assert!(parse_filter("keybridge=trace,info").is_ok());
    }
}
