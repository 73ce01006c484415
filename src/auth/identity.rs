//! Header-based identity extraction
//!
//! The actor identifier arrives on a trusted header set by the fronting
//! proxy or session layer (e.g. `x-forwarded-user`). Requests without a
//! usable value fail `Unauthenticated` before any core operation runs.

use crate::config::AuthConfig;
use crate::errors::{KeybridgeError, Result};
use http::HeaderMap;

/// Resolves the calling actor's stable identifier from request headers.
pub trait IdentityExtractor: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Result<String>;
}

/// Reads the actor from a configurable trusted header.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    pub fn new(config: &AuthConfig) -> Self {
        Self { header: config.identity_header.to_lowercase() }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

impl IdentityExtractor for HeaderIdentity {
    fn identify(&self, headers: &HeaderMap) -> Result<String> {
        let value = headers
            .get(&self.header)
            .ok_or_else(|| {
                KeybridgeError::unauthenticated(format!("Missing '{}' header", self.header))
            })?
            .to_str()
            .map_err(|_| {
                KeybridgeError::unauthenticated(format!("Invalid '{}' header value", self.header))
            })?
            .trim();

        if value.is_empty() {
            return Err(KeybridgeError::unauthenticated(format!(
                "Empty '{}' header",
                self.header
            )));
        }

        Ok(value.to_string())
    }
}
