//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for the secret-event
//! ledger. The ledger is the only state this crate owns; client
//! registrations live upstream.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use migrations::{get_migration_version, run_migrations, validate_migrations};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    SecretAction, SecretEvent, SecretLedger, SqlxSecretLedger, SECRET_LAST4_LEN,
};

use crate::errors::{KeybridgeError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| KeybridgeError::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_and_check_connection() {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_auto_migrate_on_pool_creation() {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            auto_migrate: true,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        assert!(get_migration_version(&pool).await.unwrap() >= 1);
    }
}
