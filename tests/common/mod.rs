//! Shared helpers for integration tests: a mock upstream IdP admin API and
//! wired-up broker components pointing at it.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use keybridge::config::{DatabaseConfig, UpstreamConfig};
use keybridge::storage::{create_pool, DbPool};
use keybridge::upstream::{AdminChannel, ClientRegistry, TokenCache};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/realms/master/protocol/openid-connect/token";

pub fn upstream_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        username: Some("admin".to_string()),
        password: Some("admin".to_string()),
        ..Default::default()
    }
}

/// Token endpoint returning a long-lived admin token.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "admin-token",
            "expires_in": 300
        })))
        .mount(server)
        .await;
}

pub fn token_cache(server: &MockServer) -> Arc<TokenCache> {
    Arc::new(TokenCache::new(reqwest::Client::new(), upstream_config(&server.uri())))
}

pub fn registry(server: &MockServer) -> Arc<ClientRegistry> {
    let config = upstream_config(&server.uri());
    let tokens = Arc::new(TokenCache::new(reqwest::Client::new(), config.clone()));
    let channel = AdminChannel::new(&config, tokens).expect("channel");
    Arc::new(ClientRegistry::new(channel))
}

/// In-memory ledger database. A single connection keeps every query on the
/// same database.
pub async fn ledger_pool(auto_migrate: bool) -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite://:memory:".to_string(),
        max_connections: 1,
        auto_migrate,
        ..Default::default()
    };
    create_pool(&config).await.expect("pool")
}

/// A registration payload as the upstream admin API would return it.
pub fn upstream_client_json(
    id: &str,
    client_id: &str,
    name: Option<&str>,
    attributes: serde_json::Value,
) -> serde_json::Value {
    json!({
        "id": id,
        "clientId": client_id,
        "name": name,
        "enabled": true,
        "protocol": "openid-connect",
        "publicClient": false,
        "redirectUris": [],
        "webOrigins": [],
        "attributes": attributes
    })
}
