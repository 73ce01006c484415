//! # Configuration Management
//!
//! Environment-driven configuration for the keybridge broker.

mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, GrantStyle, ObservabilityConfig, UpstreamConfig,
};

use crate::errors::Result;

/// Load configuration from the environment (including a `.env` file when
/// present) and validate it.
pub fn load() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    config.validate()?;
    Ok(config)
}
