//! # Database Migration Management
//!
//! Schema evolution for the ledger database. Migrations are embedded in the
//! binary and applied inside transactions, with an application-owned tracking
//! table recording what has run.

use crate::errors::{KeybridgeError, Result};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::{error, info, warn};

/// Embedded migrations, ordered by version prefix.
const MIGRATIONS: &[(&str, &str)] =
    &[("0001_create_secret_events", include_str!("../../migrations/0001_create_secret_events.sql"))];

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    create_migration_table(pool).await?;

    let applied = get_applied_migration_versions(pool).await?;

    let mut migrations_run = 0;
    for (name, sql) in MIGRATIONS {
        let version = extract_version(name)?;

        if applied.contains(&version) {
            continue;
        }

        info!(version = version, "Running migration: {}", name);
        let start_time = std::time::Instant::now();

        let mut tx = pool.begin().await.map_err(|e| {
            KeybridgeError::database(e, "Failed to start migration transaction")
        })?;

        // raw_sql supports multi-statement migration files
        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = name, "Migration failed");
            KeybridgeError::database(e, format!("Migration failed: {}", name))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        sqlx::query(
            "INSERT INTO _keybridge_migrations (version, description, checksum, execution_time, installed_on) \
             VALUES ($1, $2, $3, $4, CURRENT_TIMESTAMP)",
        )
        .bind(version)
        .bind(name)
        .bind(calculate_checksum(sql))
        .bind(execution_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| KeybridgeError::database(e, format!("Failed to record migration: {}", name)))?;

        tx.commit().await.map_err(|e| {
            KeybridgeError::database(e, "Failed to commit migration transaction")
        })?;

        migrations_run += 1;
        info!(version = version, execution_time_ms = execution_time, "Migration completed: {}", name);
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _keybridge_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BLOB NOT NULL,
            execution_time INTEGER NOT NULL,
            installed_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#,
    )
    .execute(pool)
    .await
    .map_err(|e| KeybridgeError::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

/// Get list of applied migration versions
async fn get_applied_migration_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _keybridge_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| KeybridgeError::database(e, "Failed to get applied migrations"))?;

    Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect())
}

/// Extract version number from a migration name like `0001_create_secret_events`
fn extract_version(name: &str) -> Result<i64> {
    let version_str = name
        .split('_')
        .next()
        .ok_or_else(|| KeybridgeError::validation(format!("Invalid migration name: {}", name)))?;

    version_str
        .parse::<i64>()
        .map_err(|_| KeybridgeError::validation(format!("Invalid version in migration name: {}", name)))
}

/// Calculate checksum for migration content
fn calculate_checksum(content: &str) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish().to_le_bytes().to_vec()
}

/// Validate that applied migrations match the embedded set exactly
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    let applied = get_applied_migration_versions(pool).await?;
    let expected: Vec<i64> =
        MIGRATIONS.iter().map(|(name, _)| extract_version(name)).collect::<Result<Vec<_>>>()?;

    for version in &expected {
        if !applied.contains(version) {
            warn!(version = *version, "Missing migration");
            return Ok(false);
        }
    }

    for version in &applied {
        if !expected.contains(version) {
            warn!(version = *version, "Unexpected migration found");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Get the current migration version (highest applied)
pub async fn get_migration_version(pool: &DbPool) -> Result<i64> {
    let applied = get_applied_migration_versions(pool).await?;
    Ok(applied.into_iter().max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    async fn memory_pool() -> DbPool {
        // A single connection keeps every query on the same in-memory database.
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };
        create_pool(&config).await.unwrap()
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("0001_create_secret_events").unwrap(), 1);
        assert!(extract_version("not_a_version").is_err());
    }

    #[test]
    fn test_calculate_checksum_stable() {
        let a = calculate_checksum("CREATE TABLE t (id INTEGER);");
        let b = calculate_checksum("CREATE TABLE t (id INTEGER);");
        let c = calculate_checksum("CREATE TABLE u (id INTEGER);");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = memory_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        assert_eq!(get_migration_version(&pool).await.unwrap(), 1);
        assert!(validate_migrations(&pool).await.unwrap());
    }
}
