//! # Database Migration System
//!
//! Versioned schema migrations for the SQLite job store.
//!
//! Migrations are embedded at compile time from the `migrations/` directory
//! using the naming convention `YYYYMMDDHHMMSS_description.sql`, and applied
//! in version order inside one transaction each. Applied versions are
//! tracked in `batcher_schema_migrations`, so `run_all` is idempotent.

use sqlx::SqlitePool;
use tracing::{debug, info};

/// Represents a single embedded migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Version timestamp (YYYYMMDDHHMMSS format)
    pub version: &'static str,
    /// Human-readable migration name
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250101000000",
        name: "create_batch_tasks",
        sql: include_str!("../../migrations/20250101000000_create_batch_tasks.sql"),
    },
    Migration {
        version: "20250101000001",
        name: "create_sub_tasks",
        sql: include_str!("../../migrations/20250101000001_create_sub_tasks.sql"),
    },
];

/// Manages database schema migrations.
pub struct DatabaseMigrations;

impl DatabaseMigrations {
    /// All embedded migrations in version order
    pub fn all() -> &'static [Migration] {
        MIGRATIONS
    }

    /// Run all outstanding migrations in order
    pub async fn run_all(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        Self::ensure_migration_table(pool).await?;

        let mut applied = 0usize;
        for migration in MIGRATIONS {
            if Self::is_applied(pool, migration.version).await? {
                debug!(version = migration.version, "Migration already applied");
                continue;
            }

            let mut tx = pool.begin().await?;
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
            sqlx::query(
                "INSERT INTO batcher_schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            )
            .bind(migration.version)
            .bind(migration.name)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            info!(version = migration.version, name = migration.name, "Applied migration");
            applied += 1;
        }

        debug!(applied, total = MIGRATIONS.len(), "Schema up to date");
        Ok(())
    }

    /// Versions recorded as applied, ascending
    pub async fn applied_versions(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT version FROM batcher_schema_migrations ORDER BY version ASC",
        )
        .fetch_all(pool)
        .await
    }

    async fn ensure_migration_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS batcher_schema_migrations (
                version TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn is_applied(pool: &SqlitePool, version: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM batcher_schema_migrations WHERE version = ?)",
        )
        .bind(version)
        .fetch_one(pool)
        .await
    }
}
