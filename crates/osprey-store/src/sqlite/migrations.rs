//! Schema migrations for the SQLite backend.
//!
//! The schema is small enough that migrations are applied as idempotent DDL
//! at startup, versioned through a `schema_version` table. Bumping the
//! persisted document shape goes through [`osprey_core::DOCUMENT_KEY`]
//! instead: a new key, with prior keys migrated or discarded.

use sqlx::SqlitePool;

use osprey_core::error::{OspreyError, Result};

const SCHEMA_VERSION: i64 = 1;

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        key TEXT PRIMARY KEY,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS blobs (
        id TEXT PRIMARY KEY,
        bytes BLOB NOT NULL,
        created_at TEXT NOT NULL
    )",
];

/// Apply the schema, recording the version on first run.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await.map_err(|e| OspreyError::StorageUnavailable {
        reason: format!("Failed to begin migration transaction: {}", e),
    })?;

    for statement in DDL {
        sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
            OspreyError::StorageUnavailable { reason: format!("Migration failed: {}", e) }
        })?;
    }

    sqlx::query(
        "INSERT INTO schema_version (version, applied_at)
         VALUES (?1, ?2)
         ON CONFLICT (version) DO NOTHING",
    )
    .bind(SCHEMA_VERSION)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|e| OspreyError::StorageUnavailable {
        reason: format!("Failed to record schema version: {}", e),
    })?;

    tx.commit().await.map_err(|e| OspreyError::StorageUnavailable {
        reason: format!("Failed to commit migrations: {}", e),
    })?;

    tracing::debug!(version = SCHEMA_VERSION, "Schema up to date");
    Ok(())
}
