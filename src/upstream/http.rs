//! Authenticated HTTP channel to the upstream admin API
//!
//! Thin wrapper over `reqwest` that attaches the cached admin bearer token to
//! every request and translates upstream HTTP status codes into this crate's
//! typed errors. Raw transport errors never leave this module.

use crate::config::UpstreamConfig;
use crate::errors::{KeybridgeError, Result};
use crate::upstream::token::TokenCache;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Authenticated channel to the upstream admin API.
#[derive(Debug, Clone)]
pub struct AdminChannel {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenCache>,
}

impl AdminChannel {
    pub fn new(config: &UpstreamConfig, tokens: Arc<TokenCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KeybridgeError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string(), tokens })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        resource: &str,
        id: &str,
    ) -> Result<Response> {
        let token = self.tokens.bearer().await?;
        let url = self.url(path);
        tracing::debug!(method = %method, url = %url, "Upstream admin request");

        let mut request = self.client.request(method, &url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| KeybridgeError::upstream(format!("Request to {} failed: {}", url, e)))?;

        self.check_status(response, resource, id).await
    }

    /// Translate upstream status codes into typed errors at this boundary.
    async fn check_status(&self, response: Response, resource: &str, id: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            401 | 403 => {
                // The cached token is no longer honored; the next caller
                // refreshes instead of replaying the stale one.
                self.tokens.invalidate().await;
                Err(KeybridgeError::auth_failure(format!(
                    "Upstream rejected the admin token (status {})",
                    status.as_u16()
                )))
            }
            404 => Err(KeybridgeError::not_found(resource, id)),
            409 => Err(KeybridgeError::already_exists(format!(
                "{} '{}' already exists upstream",
                resource, id
            ))),
            code if status.is_server_error() => Err(KeybridgeError::upstream(format!(
                "Upstream returned status {} for {} '{}'",
                code, resource, id
            ))),
            code => Err(KeybridgeError::internal(format!(
                "Unexpected upstream status {} for {} '{}'",
                code, resource, id
            ))),
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let text = response
            .text()
            .await
            .map_err(|e| KeybridgeError::upstream(format!("Failed to read upstream body: {}", e)))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET with optional query parameters, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource: &str,
        id: &str,
    ) -> Result<T> {
        let response = self.send(Method::GET, path, query, None, resource, id).await?;
        self.decode(response).await
    }

    /// POST a JSON body, returning the raw response for header inspection.
    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
        id: &str,
    ) -> Result<Response> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, &[], Some(&body), resource, id).await
    }

    /// POST without a body, decoding a JSON response.
    pub async fn post_empty_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
        id: &str,
    ) -> Result<T> {
        let response = self.send(Method::POST, path, &[], None, resource, id).await?;
        self.decode(response).await
    }

    /// PUT a JSON body, ignoring the response body.
    pub async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
        id: &str,
    ) -> Result<()> {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, &[], Some(&body), resource, id).await?;
        Ok(())
    }

    /// DELETE, ignoring the response body.
    pub async fn delete(&self, path: &str, resource: &str, id: &str) -> Result<()> {
        self.send(Method::DELETE, path, &[], None, resource, id).await?;
        Ok(())
    }
}
