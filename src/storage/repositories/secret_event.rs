//! Secret-event ledger repository
//!
//! Append-only audit trail of client-secret lifecycle events. Rows are never
//! mutated or deleted; deleting the parent client registration upstream
//! leaves its history queryable. The full secret value is never accepted
//! here, only its last four characters (or nothing at all).

use crate::errors::{KeybridgeError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use std::str::FromStr;

/// Maximum number of secret characters the ledger will persist.
pub const SECRET_LAST4_LEN: usize = 4;

/// Lifecycle action recorded by a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretAction {
    Created,
    Regenerated,
    Deleted,
}

impl SecretAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretAction::Created => "created",
            SecretAction::Regenerated => "regenerated",
            SecretAction::Deleted => "deleted",
        }
    }
}

impl FromStr for SecretAction {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(SecretAction::Created),
            "regenerated" => Ok(SecretAction::Regenerated),
            "deleted" => Ok(SecretAction::Deleted),
            _ => Err(()),
        }
    }
}

/// One row of the secret-event ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretEvent {
    /// Monotonic ledger sequence; ties between concurrent writes are broken
    /// by this id, not by the wall-clock timestamp.
    pub id: i64,
    pub realm: String,
    /// Upstream-assigned client registration id.
    pub client_id: String,
    /// Actor that performed the secret-affecting operation.
    pub created_by: String,
    pub action: SecretAction,
    /// Last four characters of the secret, absent when upstream did not
    /// return the value.
    pub secret_last4: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct SecretEventRow {
    pub id: i64,
    pub realm: String,
    pub client_id: String,
    pub created_by: String,
    pub action: String,
    pub secret_last4: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SecretEventRow {
    fn into_model(self) -> Result<SecretEvent> {
        let action = SecretAction::from_str(&self.action).map_err(|_| {
            KeybridgeError::validation(format!(
                "Unknown ledger action '{}' for event {}",
                self.action, self.id
            ))
        })?;

        Ok(SecretEvent {
            id: self.id,
            realm: self.realm,
            client_id: self.client_id,
            created_by: self.created_by,
            action,
            secret_last4: self.secret_last4,
            created_at: self.created_at,
        })
    }
}

/// Append-only ledger of secret lifecycle events.
#[async_trait]
pub trait SecretLedger: Send + Sync {
    /// Append one event. Fails with `Validation` if `secret_last4` is longer
    /// than four characters and with `LedgerWriteFailure` if the row cannot
    /// be persisted.
    async fn record(
        &self,
        realm: &str,
        client_id: &str,
        actor: &str,
        action: SecretAction,
        secret_last4: Option<&str>,
    ) -> Result<SecretEvent>;

    /// Events for `(realm, client_id)` authored by `actor`, newest first.
    ///
    /// The actor filter is an intentional privacy boundary: callers see only
    /// their own rotation history, not other actors' events for the same
    /// client.
    async fn history(&self, realm: &str, client_id: &str, actor: &str)
        -> Result<Vec<SecretEvent>>;
}

/// SQLite-backed ledger implementation.
#[derive(Debug, Clone)]
pub struct SqlxSecretLedger {
    pool: DbPool,
}

impl SqlxSecretLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretLedger for SqlxSecretLedger {
    async fn record(
        &self,
        realm: &str,
        client_id: &str,
        actor: &str,
        action: SecretAction,
        secret_last4: Option<&str>,
    ) -> Result<SecretEvent> {
        if let Some(last4) = secret_last4 {
            if last4.chars().count() > SECRET_LAST4_LEN {
                return Err(KeybridgeError::validation(format!(
                    "Ledger accepts at most {} secret characters, got {}",
                    SECRET_LAST4_LEN,
                    last4.chars().count()
                )));
            }
        }

        let result = sqlx::query(
            "INSERT INTO secret_events (realm, client_id, created_by, action, secret_last4, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(realm)
        .bind(client_id)
        .bind(actor)
        .bind(action.as_str())
        .bind(secret_last4)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| KeybridgeError::ledger(e, "Failed to append secret event"))?;

        let id = result.last_insert_rowid();
        tracing::debug!(
            realm = %realm,
            client_id = %client_id,
            actor = %actor,
            action = %action.as_str(),
            ledger_id = id,
            "Recorded secret event"
        );

        let row: SecretEventRow = sqlx::query_as(
            "SELECT id, realm, client_id, created_by, action, secret_last4, created_at \
             FROM secret_events WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KeybridgeError::database(e, "Failed to read back secret event"))?;

        row.into_model()
    }

    async fn history(
        &self,
        realm: &str,
        client_id: &str,
        actor: &str,
    ) -> Result<Vec<SecretEvent>> {
        let rows: Vec<SecretEventRow> = sqlx::query_as(
            "SELECT id, realm, client_id, created_by, action, secret_last4, created_at \
             FROM secret_events \
             WHERE realm = $1 AND client_id = $2 AND created_by = $3 \
             ORDER BY id DESC",
        )
        .bind(realm)
        .bind(client_id)
        .bind(actor)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KeybridgeError::database(e, "Failed to fetch secret event history"))?;

        rows.into_iter().map(SecretEventRow::into_model).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    // A single connection keeps every query on the same in-memory database.
    fn memory_config(auto_migrate: bool) -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            auto_migrate,
            ..Default::default()
        }
    }

    async fn ledger() -> SqlxSecretLedger {
        SqlxSecretLedger::new(create_pool(&memory_config(true)).await.unwrap())
    }

    #[tokio::test]
    async fn test_record_and_history_roundtrip() {
        let ledger = ledger().await;

        let event = ledger
            .record("acme", "id-1", "u1", SecretAction::Created, Some("ab12"))
            .await
            .unwrap();
        assert_eq!(event.action, SecretAction::Created);
        assert_eq!(event.secret_last4.as_deref(), Some("ab12"));

        let history = ledger.history("acme", "id-1", "u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], event);
    }

    #[tokio::test]
    async fn test_history_filtered_by_actor() {
        let ledger = ledger().await;

        ledger.record("acme", "id-1", "u1", SecretAction::Regenerated, Some("1111")).await.unwrap();
        ledger.record("acme", "id-1", "u2", SecretAction::Regenerated, Some("2222")).await.unwrap();
        ledger.record("acme", "id-1", "u1", SecretAction::Regenerated, Some("3333")).await.unwrap();

        let history = ledger.history("acme", "id-1", "u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|event| event.created_by == "u1"));
    }

    #[tokio::test]
    async fn test_history_newest_first_by_ledger_sequence() {
        let ledger = ledger().await;

        ledger.record("acme", "id-1", "u1", SecretAction::Created, Some("aaaa")).await.unwrap();
        ledger.record("acme", "id-1", "u1", SecretAction::Regenerated, Some("bbbb")).await.unwrap();
        ledger.record("acme", "id-1", "u1", SecretAction::Deleted, None).await.unwrap();

        let history = ledger.history("acme", "id-1", "u1").await.unwrap();
        let ids: Vec<i64> = history.iter().map(|event| event.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted);
        assert_eq!(history[0].action, SecretAction::Deleted);
    }

    #[tokio::test]
    async fn test_null_last4_accepted() {
        let ledger = ledger().await;

        let event =
            ledger.record("acme", "id-1", "u1", SecretAction::Deleted, None).await.unwrap();
        assert!(event.secret_last4.is_none());
    }

    #[tokio::test]
    async fn test_rejects_more_than_four_characters() {
        let ledger = ledger().await;

        let result = ledger
            .record("acme", "id-1", "u1", SecretAction::Created, Some("abcde"))
            .await;
        assert!(matches!(result, Err(KeybridgeError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_history_scoped_by_realm_and_client() {
        let ledger = ledger().await;

        ledger.record("acme", "id-1", "u1", SecretAction::Created, Some("aaaa")).await.unwrap();
        ledger.record("acme", "id-2", "u1", SecretAction::Created, Some("bbbb")).await.unwrap();
        ledger.record("other", "id-1", "u1", SecretAction::Created, Some("cccc")).await.unwrap();

        let history = ledger.history("acme", "id-1", "u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].secret_last4.as_deref(), Some("aaaa"));
    }

    #[tokio::test]
    async fn test_write_without_schema_is_ledger_failure() {
        let ledger = SqlxSecretLedger::new(create_pool(&memory_config(false)).await.unwrap());

        let result = ledger.record("acme", "id-1", "u1", SecretAction::Created, None).await;
        assert!(matches!(result, Err(KeybridgeError::LedgerWriteFailure { .. })));
    }

    #[tokio::test]
    async fn test_file_backed_ledger_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("ledger.db").display()),
            auto_migrate: true,
            ..Default::default()
        };

        let ledger = SqlxSecretLedger::new(create_pool(&config).await.unwrap());
        ledger.record("acme", "id-1", "u1", SecretAction::Created, Some("ab12")).await.unwrap();

        // A second pool over the same file sees the committed row; migrations
        // re-run as a no-op.
        let reopened = SqlxSecretLedger::new(create_pool(&config).await.unwrap());
        let history = reopened.history("acme", "id-1", "u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].secret_last4.as_deref(), Some("ab12"));
    }
}
