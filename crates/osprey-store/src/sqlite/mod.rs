//! SQLite storage adapter implementation
//!
//! One local database file holds both durability domains: the `documents`
//! table for survey snapshots and the `blobs` table for full-resolution
//! photo binaries. The two tables are written in independent transactions,
//! matching the no-shared-transaction model: a crash between a blob commit
//! and its referencing document commit leaves harmless garbage, never a
//! dangling reference.

pub mod blob;
pub mod config;
pub mod document;
pub mod health;
pub mod migrations;

pub use config::SqliteConfig;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use osprey_core::error::{OspreyError, Result};

/// SQLite storage adapter
pub struct SqliteStore {
    pool: SqlitePool,
    config: SqliteConfig,
}

impl SqliteStore {
    /// Open (or create) the database file with the given configuration.
    pub async fn new(config: SqliteConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| OspreyError::StorageUnavailable {
                reason: format!("Failed to open database at {}: {}", config.path.display(), e),
            })?;

        Ok(Self { pool, config })
    }

    /// Open the database and apply the schema.
    pub async fn with_migrations(config: SqliteConfig) -> Result<Self> {
        let store = Self::new(config).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply all pending schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn config(&self) -> &SqliteConfig {
        &self.config
    }
}
