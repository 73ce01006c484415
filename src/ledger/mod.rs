//! # Secret lifecycle coordination
//!
//! Ties the registry proxy and the secret-event ledger together so every
//! secret-affecting operation leaves an audit row. The upstream mutation
//! always happens first: a rotation that succeeds upstream but fails to
//! write its audit row cannot be rolled back (the old secret is gone), so
//! the outcome carries a partial-success flag instead of pretending the
//! operation failed or silently dropping the gap.

use crate::errors::Result;
use crate::storage::{SecretAction, SecretLedger, SECRET_LAST4_LEN};
use crate::upstream::ClientRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a secret-affecting operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationOutcome {
    /// Last four characters of the resulting secret; absent when upstream
    /// did not return the value or the secret no longer exists.
    pub secret_last4: Option<String>,
    /// False means the upstream operation succeeded but the audit row was
    /// lost — a real audit gap the caller must surface, not an error.
    pub audit_recorded: bool,
}

/// Coordinates upstream secret operations with the audit ledger.
pub struct SecretLifecycle {
    registry: Arc<ClientRegistry>,
    ledger: Arc<dyn SecretLedger>,
}

impl SecretLifecycle {
    pub fn new(registry: Arc<ClientRegistry>, ledger: Arc<dyn SecretLedger>) -> Self {
        Self { registry, ledger }
    }

    /// Record the initial secret of a freshly created confidential client.
    pub async fn initial_secret(
        &self,
        realm: &str,
        id: &str,
        actor: &str,
    ) -> Result<RotationOutcome> {
        let secret = self.registry.get_secret(realm, id).await?;
        Ok(self.append(realm, id, actor, SecretAction::Created, secret).await)
    }

    /// Rotate the client secret upstream and record the event.
    pub async fn rotate(&self, realm: &str, id: &str, actor: &str) -> Result<RotationOutcome> {
        let secret = self.registry.regenerate_secret(realm, id).await?;
        Ok(self.append(realm, id, actor, SecretAction::Regenerated, secret).await)
    }

    /// Delete the client upstream and record the retirement of its secret.
    /// Prior ledger rows for the id remain queryable.
    pub async fn retire(&self, realm: &str, id: &str, actor: &str) -> Result<RotationOutcome> {
        self.registry.delete(realm, id).await?;
        Ok(self.append(realm, id, actor, SecretAction::Deleted, None).await)
    }

    /// Append the audit row for an upstream operation that already happened.
    /// A ledger failure here degrades to `audit_recorded: false`.
    async fn append(
        &self,
        realm: &str,
        id: &str,
        actor: &str,
        action: SecretAction,
        secret: Option<String>,
    ) -> RotationOutcome {
        let secret_last4 = secret.as_deref().map(last4);

        let audit_recorded = match self
            .ledger
            .record(realm, id, actor, action, secret_last4.as_deref())
            .await
        {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(
                    realm = %realm,
                    client_id = %id,
                    actor = %actor,
                    action = %action.as_str(),
                    error = %error,
                    "Secret operation succeeded upstream but the audit row was not written"
                );
                false
            }
        };

        RotationOutcome { secret_last4, audit_recorded }
    }
}

/// Last four characters of a secret; shorter secrets pass through whole.
/// The full value never travels further than this function.
fn last4(secret: &str) -> String {
    let count = secret.chars().count();
    secret.chars().skip(count.saturating_sub(SECRET_LAST4_LEN)).collect()
}
