//! Admin token acquisition and caching
//!
//! The upstream admin API requires a bearer token per request; without a
//! cache every operation would re-authenticate. The cache holds one token and
//! refreshes it with a single upstream call no matter how many callers race
//! the expiry: the cache slot's lock is held across the refresh, so
//! concurrent requesters await the in-flight grant and share its result.

use crate::config::{GrantStyle, UpstreamConfig};
use crate::errors::{KeybridgeError, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cached administrative bearer token. Never persisted, never logged.
#[derive(Debug, Clone)]
struct AdminToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Caches the administrative bearer token for the upstream IdP.
pub struct TokenCache {
    http: reqwest::Client,
    config: UpstreamConfig,
    slot: Mutex<Option<AdminToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config, slot: Mutex::new(None) }
    }

    /// Return a bearer token valid for at least the configured safety margin.
    ///
    /// A cached unexpired token is returned without network I/O; otherwise
    /// one OAuth grant request is performed while holding the slot lock. A
    /// failed refresh leaves the slot empty so the next call retries; there
    /// is no internal retry.
    pub async fn bearer(&self) -> Result<String> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
            tracing::debug!("Cached admin token expired");
        }

        *slot = None;
        let token = self.fetch().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next caller refreshes. Used after the
    /// upstream rejects a token mid-operation.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            tracing::debug!("Invalidated cached admin token");
        }
    }

    async fn fetch(&self) -> Result<AdminToken> {
        let endpoint = self.config.token_endpoint();
        let mut params: Vec<(&str, &str)> = vec![("client_id", &self.config.client_id)];

        match self.config.grant_style() {
            GrantStyle::Password => {
                params.push(("grant_type", "password"));
                // Presence is guaranteed by config validation
                if let (Some(username), Some(password)) =
                    (self.config.username.as_deref(), self.config.password.as_deref())
                {
                    params.push(("username", username));
                    params.push(("password", password));
                }
                if let Some(secret) = self.config.client_secret.as_deref() {
                    params.push(("client_secret", secret));
                }
            }
            GrantStyle::ClientCredentials => {
                params.push(("grant_type", "client_credentials"));
                if let Some(secret) = self.config.client_secret.as_deref() {
                    params.push(("client_secret", secret));
                }
            }
        }

        let response = self
            .http
            .post(&endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| KeybridgeError::auth_failure(format!("Token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeybridgeError::auth_failure(format!(
                "Token endpoint rejected the configured credentials (status {})",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            KeybridgeError::auth_failure(format!("Malformed token endpoint response: {}", e))
        })?;

        let margin = self.config.token_safety_margin_seconds;
        // An upstream lifetime shorter than the safety margin is taken as-is;
        // the alternative is a token that is expired the moment it is issued.
        let lifetime = match body.expires_in.saturating_sub(margin) {
            0 => body.expires_in,
            trimmed => trimmed,
        };

        tracing::debug!(expires_in = body.expires_in, effective_lifetime = lifetime, "Admin token refreshed");

        Ok(AdminToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Deliberately omits the slot so token material never reaches logs
        f.debug_struct("TokenCache").field("endpoint", &self.config.token_endpoint()).finish()
    }
}
