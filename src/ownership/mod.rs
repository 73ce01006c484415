//! # Ownership claims
//!
//! The claim/adopt protocol: an actor becomes the attributed owner of a
//! registration that exists upstream but was created outside attribution,
//! e.g. provisioned by hand or before this broker existed.
//!
//! Claiming is last-writer-wins by design. Nothing prevents a second actor
//! from re-claiming an already-claimed client, and two actors racing to
//! claim the same registration interleave with undefined ordering. That is
//! a documented limitation of this low-stakes internal protocol, not an
//! invariant to tighten.

use crate::errors::{ClaimCandidate, KeybridgeError, Result};
use crate::upstream::{
    ClientRegistration, ClientRegistry, ATTR_CREATED_BY_TAG, ATTR_INHERITED_AT, ATTR_INHERITED_BY,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Value written to `createdByTag` on a successful claim.
pub const INHERITED_TAG: &str = "inherited";

/// How the caller names the registration to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSelector {
    /// Exact match on the human-chosen clientId.
    ClientId(String),
    /// Case-sensitive exact match on the display name. Fails `Ambiguous`
    /// when several registrations share the name.
    Name(String),
}

/// Success payload of a claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimReceipt {
    pub message: String,
    pub id: String,
    pub client_id: String,
    pub name: Option<String>,
    pub attributes: HashMap<String, String>,
}

/// Implements the claim/adopt protocol on top of the registry proxy.
#[derive(Debug, Clone)]
pub struct OwnershipResolver {
    registry: Arc<ClientRegistry>,
}

impl OwnershipResolver {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Adopt a registration for `actor`.
    ///
    /// The read (lookup) and write (attribute update) are separate upstream
    /// calls with no transaction between them; a racing operation on the
    /// same registration can interleave.
    pub async fn claim(
        &self,
        realm: &str,
        actor: &str,
        selector: ClaimSelector,
    ) -> Result<ClaimReceipt> {
        let registration = self.resolve(realm, &selector).await?;

        let id = registration.id.clone().ok_or_else(|| {
            KeybridgeError::internal("Upstream returned a registration without an id")
        })?;

        let mut claimed = registration;
        // Pre-existing createdBy is preserved for provenance; the claim is
        // layered on top of it.
        claimed.attributes.insert(ATTR_CREATED_BY_TAG.to_string(), INHERITED_TAG.to_string());
        claimed.attributes.insert(ATTR_INHERITED_BY.to_string(), actor.to_string());
        claimed
            .attributes
            .insert(ATTR_INHERITED_AT.to_string(), chrono::Utc::now().to_rfc3339());

        self.registry.update(realm, &id, &claimed).await?;

        tracing::info!(
            realm = %realm,
            id = %id,
            client_id = %claimed.client_id,
            actor = %actor,
            "Client registration claimed"
        );

        Ok(ClaimReceipt {
            message: format!("Client '{}' is now attributed to {}", claimed.client_id, actor),
            id,
            client_id: claimed.client_id,
            name: claimed.name,
            attributes: claimed.attributes,
        })
    }

    async fn resolve(&self, realm: &str, selector: &ClaimSelector) -> Result<ClientRegistration> {
        match selector {
            ClaimSelector::ClientId(client_id) => {
                self.registry.get_by_client_id(realm, client_id).await
            }
            ClaimSelector::Name(name) => {
                let mut matches: Vec<ClientRegistration> = self
                    .registry
                    .list(realm)
                    .await?
                    .into_iter()
                    .filter(|registration| registration.name.as_deref() == Some(name.as_str()))
                    .collect();

                match matches.len() {
                    0 => Err(KeybridgeError::not_found("client", name.clone())),
                    1 => Ok(matches.remove(0)),
                    _ => {
                        let candidates = matches
                            .into_iter()
                            .map(|registration| ClaimCandidate {
                                id: registration.id.unwrap_or_default(),
                                client_id: registration.client_id,
                                name: registration.name,
                            })
                            .collect();
                        Err(KeybridgeError::ambiguous(candidates))
                    }
                }
            }
        }
    }
}
