//! Client-registration proxy
//!
//! CRUD against the upstream admin API's `/clients` resource, layering
//! creator attribution on top: every registration created through this proxy
//! carries a `createdBy` attribute naming the acting principal, and the
//! "my clients" view filters on that attribute server-side.
//!
//! The attribute bag is exactly that, a free-form attribute bag. `createdBy`
//! is attribution metadata, not an access-control list; nothing upstream
//! stops a caller who knows an id from reading or mutating a registration
//! they did not create.

use crate::errors::{KeybridgeError, Result};
use crate::upstream::http::AdminChannel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute naming the actor that created a registration.
pub const ATTR_CREATED_BY: &str = "createdBy";
/// Attribute marking a registration whose ownership was claimed after the fact.
pub const ATTR_CREATED_BY_TAG: &str = "createdByTag";
/// Attribute naming the actor that claimed the registration.
pub const ATTR_INHERITED_BY: &str = "inheritedBy";
/// Attribute carrying the ISO-8601 claim timestamp.
pub const ATTR_INHERITED_AT: &str = "inheritedAt";

fn default_true() -> bool {
    true
}

/// An OAuth2/OIDC client registration as the upstream admin API represents
/// it. Owned by the upstream IdP; this crate only reads and writes it through
/// the proxy. The realm is a call parameter throughout, never a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    /// Upstream-assigned stable id. Absent on create requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-chosen identifier, unique per realm (enforced upstream).
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub public_client: bool,
    #[serde(default)]
    pub bearer_only: bool,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub web_origins: Vec<String>,
    #[serde(default)]
    pub service_accounts_enabled: bool,
    #[serde(default)]
    pub authorization_services_enabled: bool,
    #[serde(default)]
    pub direct_access_grants_enabled: bool,
    #[serde(default)]
    pub implicit_flow_enabled: bool,
    #[serde(default = "default_true")]
    pub standard_flow_enabled: bool,
    /// Free-form attribute bag; carries the attribution keys.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Default for ClientRegistration {
    fn default() -> Self {
        Self {
            id: None,
            client_id: String::new(),
            name: None,
            description: None,
            enabled: true,
            protocol: Some("openid-connect".to_string()),
            public_client: false,
            bearer_only: false,
            redirect_uris: Vec::new(),
            web_origins: Vec::new(),
            service_accounts_enabled: false,
            authorization_services_enabled: false,
            direct_access_grants_enabled: false,
            implicit_flow_enabled: false,
            standard_flow_enabled: true,
            attributes: HashMap::new(),
        }
    }
}

impl ClientRegistration {
    /// Actor recorded at creation time, if any.
    pub fn created_by(&self) -> Option<&str> {
        self.attributes.get(ATTR_CREATED_BY).map(String::as_str)
    }
}

/// Secret representation returned by the nested `/client-secret` resource.
#[derive(Debug, Deserialize)]
struct CredentialRepresentation {
    #[serde(default)]
    value: Option<String>,
}

/// Proxy for upstream client-registration CRUD.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    channel: AdminChannel,
}

impl ClientRegistry {
    pub fn new(channel: AdminChannel) -> Self {
        Self { channel }
    }

    fn clients_path(realm: &str) -> String {
        format!("/admin/realms/{}/clients", realm)
    }

    fn client_path(realm: &str, id: &str) -> String {
        format!("/admin/realms/{}/clients/{}", realm, id)
    }

    fn secret_path(realm: &str, id: &str) -> String {
        format!("/admin/realms/{}/clients/{}/client-secret", realm, id)
    }

    /// Create a registration attributed to `actor`, returning the
    /// upstream-assigned id. A duplicate clientId within the realm surfaces
    /// as `AlreadyExists`.
    pub async fn create(
        &self,
        realm: &str,
        mut registration: ClientRegistration,
        actor: &str,
    ) -> Result<String> {
        if registration.client_id.is_empty() {
            return Err(KeybridgeError::validation("clientId cannot be empty"));
        }

        registration.attributes.insert(ATTR_CREATED_BY.to_string(), actor.to_string());
        registration.id = None;

        let response = self
            .channel
            .post_json(&Self::clients_path(realm), &registration, "client", &registration.client_id)
            .await?;

        let id = match location_id(&response) {
            Some(id) => id,
            // Upstream variants that omit the Location header still assigned
            // an id; look it up by the unique clientId.
            None => self
                .get_by_client_id(realm, &registration.client_id)
                .await?
                .id
                .ok_or_else(|| {
                    KeybridgeError::internal("Upstream returned a registration without an id")
                })?,
        };

        tracing::info!(
            realm = %realm,
            client_id = %registration.client_id,
            id = %id,
            actor = %actor,
            "Created client registration"
        );
        Ok(id)
    }

    /// Fetch a registration by its upstream id.
    pub async fn get(&self, realm: &str, id: &str) -> Result<ClientRegistration> {
        self.channel.get_json(&Self::client_path(realm, id), &[], "client", id).await
    }

    /// Fetch a registration by its human-chosen clientId (exact match).
    pub async fn get_by_client_id(
        &self,
        realm: &str,
        client_id: &str,
    ) -> Result<ClientRegistration> {
        let matches: Vec<ClientRegistration> = self
            .channel
            .get_json(&Self::clients_path(realm), &[("clientId", client_id)], "client", client_id)
            .await?;

        matches
            .into_iter()
            .find(|registration| registration.client_id == client_id)
            .ok_or_else(|| KeybridgeError::not_found("client", client_id))
    }

    /// List all registrations in a realm.
    pub async fn list(&self, realm: &str) -> Result<Vec<ClientRegistration>> {
        self.channel.get_json(&Self::clients_path(realm), &[], "realm", realm).await
    }

    /// List registrations created by `actor`, filtered server-side on the
    /// `createdBy` attribute. This is the sole filter behind "my clients"
    /// views; it is attribution-based, not an ACL.
    pub async fn list_by_creator(
        &self,
        realm: &str,
        actor: &str,
    ) -> Result<Vec<ClientRegistration>> {
        let query = format!("{}:{}", ATTR_CREATED_BY, actor);
        self.channel
            .get_json(&Self::clients_path(realm), &[("q", query.as_str())], "realm", realm)
            .await
    }

    /// Replace a registration by its upstream id.
    pub async fn update(
        &self,
        realm: &str,
        id: &str,
        registration: &ClientRegistration,
    ) -> Result<()> {
        self.channel.put_json(&Self::client_path(realm, id), registration, "client", id).await?;
        tracing::info!(realm = %realm, id = %id, "Updated client registration");
        Ok(())
    }

    /// Delete a registration by its upstream id. Ledger rows referencing the
    /// id persist as historical record.
    pub async fn delete(&self, realm: &str, id: &str) -> Result<()> {
        self.channel.delete(&Self::client_path(realm, id), "client", id).await?;
        tracing::info!(realm = %realm, id = %id, "Deleted client registration");
        Ok(())
    }

    /// Current secret of a confidential client. `None` when upstream does
    /// not return the value.
    pub async fn get_secret(&self, realm: &str, id: &str) -> Result<Option<String>> {
        let credential: CredentialRepresentation =
            self.channel.get_json(&Self::secret_path(realm, id), &[], "client", id).await?;
        Ok(credential.value)
    }

    /// Regenerate the secret, returning the new value when upstream provides
    /// it.
    pub async fn regenerate_secret(&self, realm: &str, id: &str) -> Result<Option<String>> {
        let credential: CredentialRepresentation =
            self.channel.post_empty_json(&Self::secret_path(realm, id), "client", id).await?;
        tracing::info!(realm = %realm, id = %id, "Regenerated client secret");
        Ok(credential.value)
    }
}

/// Upstream id from a create response's Location header, when present.
fn location_id(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_serializes_camel_case() {
        let registration = ClientRegistration {
            client_id: "svc-a".to_string(),
            redirect_uris: vec!["https://svc-a.internal/callback".to_string()],
            ..Default::default()
        };

        let value = serde_json::to_value(&registration).unwrap();
        assert_eq!(value["clientId"], "svc-a");
        assert_eq!(value["redirectUris"][0], "https://svc-a.internal/callback");
        assert_eq!(value["standardFlowEnabled"], true);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_registration_deserializes_sparse_upstream_payload() {
        let registration: ClientRegistration = serde_json::from_str(
            r#"{"id": "abc-123", "clientId": "svc-a", "enabled": true}"#,
        )
        .unwrap();

        assert_eq!(registration.id.as_deref(), Some("abc-123"));
        assert!(registration.standard_flow_enabled);
        assert!(registration.attributes.is_empty());
        assert!(registration.created_by().is_none());
    }

    #[test]
    fn test_created_by_reads_attribute() {
        let mut registration = ClientRegistration::default();
        registration.attributes.insert(ATTR_CREATED_BY.to_string(), "u1".to_string());
        assert_eq!(registration.created_by(), Some("u1"));
    }
}
