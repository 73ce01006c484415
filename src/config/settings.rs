//! # Configuration Settings
//!
//! Defines the configuration structure for the keybridge broker.

use crate::errors::{KeybridgeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Upstream identity-provider admin API configuration
    #[validate(nested)]
    pub upstream: UpstreamConfig,

    /// Ledger database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Caller identity configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            upstream: UpstreamConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(KeybridgeError::from)?;
        self.upstream.validate_credentials()?;

        if !self.database.url.starts_with("sqlite://") {
            return Err(KeybridgeError::validation("Database URL must start with 'sqlite://'"));
        }

        Ok(())
    }
}

/// Which OAuth grant the admin token refresh uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStyle {
    /// Resource-owner password grant (admin username/password configured)
    Password,
    /// Client-credentials grant (confidential service account configured)
    ClientCredentials,
}

/// Upstream identity-provider admin API configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpstreamConfig {
    /// Base URL of the upstream IdP (e.g. "https://idp.internal:8443")
    #[validate(length(min = 1, message = "Upstream base URL cannot be empty"))]
    pub base_url: String,

    /// Realm the admin credentials authenticate against
    #[validate(length(min = 1, message = "Admin realm cannot be empty"))]
    pub admin_realm: String,

    /// OAuth client_id used for the admin grant
    #[validate(length(min = 1, message = "Admin client_id cannot be empty"))]
    pub client_id: String,

    /// Client secret for the client-credentials grant
    pub client_secret: Option<String>,

    /// Admin username for the password grant
    pub username: Option<String>,

    /// Admin password for the password grant
    pub password: Option<String>,

    /// Upstream request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,

    /// Seconds subtracted from the issued token lifetime so a token handed to
    /// a caller is never on the verge of expiry
    #[validate(range(max = 600, message = "Safety margin must be at most 600 seconds"))]
    pub token_safety_margin_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            admin_realm: "master".to_string(),
            client_id: "admin-cli".to_string(),
            client_secret: None,
            username: None,
            password: None,
            request_timeout_seconds: 30,
            token_safety_margin_seconds: 60,
        }
    }
}

impl UpstreamConfig {
    /// Create upstream configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: env_var("KEYBRIDGE_UPSTREAM_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            admin_realm: env_var("KEYBRIDGE_ADMIN_REALM").unwrap_or_else(|| "master".to_string()),
            client_id: env_var("KEYBRIDGE_ADMIN_CLIENT_ID")
                .unwrap_or_else(|| "admin-cli".to_string()),
            client_secret: env_var("KEYBRIDGE_ADMIN_CLIENT_SECRET"),
            username: env_var("KEYBRIDGE_ADMIN_USERNAME"),
            password: env_var("KEYBRIDGE_ADMIN_PASSWORD"),
            request_timeout_seconds: env_parse("KEYBRIDGE_UPSTREAM_TIMEOUT_SECONDS", 30),
            token_safety_margin_seconds: env_parse("KEYBRIDGE_TOKEN_SAFETY_MARGIN_SECONDS", 60),
        }
    }

    /// Which grant the configured credentials select. Password credentials
    /// take precedence when both are present.
    pub fn grant_style(&self) -> GrantStyle {
        if self.username.is_some() && self.password.is_some() {
            GrantStyle::Password
        } else {
            GrantStyle::ClientCredentials
        }
    }

    /// Get the upstream request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Realm-scoped OAuth token endpoint of the upstream IdP
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url.trim_end_matches('/'),
            self.admin_realm
        )
    }

    pub(crate) fn validate_credentials(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(KeybridgeError::validation(
                "Upstream base URL must start with 'http://' or 'https://'",
            ));
        }

        match (self.username.is_some(), self.password.is_some()) {
            (true, false) | (false, true) => {
                return Err(KeybridgeError::validation(
                    "Admin username and password must be configured together",
                ));
            }
            (false, false) if self.client_secret.is_none() => {
                return Err(KeybridgeError::validation(
                    "Either an admin username/password pair or a client secret must be configured",
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Ledger database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 60, message = "Connect timeout must be between 1 and 60 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations on pool creation
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/keybridge.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Create database configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            url: env_var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://./data/keybridge.db".to_string()),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 0),
            connect_timeout_seconds: env_parse("DATABASE_CONNECT_TIMEOUT_SECONDS", 10),
            idle_timeout_seconds: env_parse("DATABASE_IDLE_TIMEOUT_SECONDS", 600),
            auto_migrate: env_parse("DATABASE_AUTO_MIGRATE", true),
        }
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Caller identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Header carrying the already-resolved actor identifier
    #[validate(length(min = 1, message = "Identity header cannot be empty"))]
    pub identity_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { identity_header: "x-forwarded-user".to_string() }
    }
}

impl AuthConfig {
    /// Create auth configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            identity_header: env_var("KEYBRIDGE_IDENTITY_HEADER")
                .unwrap_or_else(|| "x-forwarded-user".to_string()),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Tracing service name
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            service_name: "keybridge".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create observability configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            log_level: env_var("KEYBRIDGE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_logging: env_parse("KEYBRIDGE_JSON_LOGGING", false),
            service_name: env_var("KEYBRIDGE_SERVICE_NAME")
                .unwrap_or_else(|| "keybridge".to_string()),
        }
    }
}
