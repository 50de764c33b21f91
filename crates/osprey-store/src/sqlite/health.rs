//! StorageHealth implementation for SQLite

use async_trait::async_trait;
use osprey_core::models::StorageEstimate;

use super::SqliteStore;
use crate::ports::StorageHealth;

#[async_trait]
impl StorageHealth for SqliteStore {
    async fn request_durability(&self) -> bool {
        // WAL plus synchronous=FULL is the closest SQLite analog to a
        // persistent-storage grant: committed pages survive both process
        // and OS crashes. Requested at open time; re-asserting here
        // confirms the pragmas actually took.
        let synchronous =
            sqlx::query_scalar::<_, i64>("PRAGMA synchronous").fetch_one(self.pool()).await;
        let journal_mode =
            sqlx::query_scalar::<_, String>("PRAGMA journal_mode").fetch_one(self.pool()).await;

        match (synchronous, journal_mode) {
            // 2 = FULL, 3 = EXTRA
            (Ok(level), Ok(mode)) => level >= 2 && mode.eq_ignore_ascii_case("wal"),
            (sync_result, journal_result) => {
                tracing::warn!(
                    ?sync_result,
                    ?journal_result,
                    "Durability probe failed; treating storage as evictable"
                );
                false
            }
        }
    }

    async fn estimate(&self) -> StorageEstimate {
        // Measure the database file plus its WAL sidecar, so bytes not yet
        // checkpointed still count against the quota.
        let db_path = self.config().path.clone();
        let usage = tokio::task::spawn_blocking(move || {
            let mut total = 0u64;
            for suffix in ["", "-wal", "-shm"] {
                let mut path = db_path.clone().into_os_string();
                path.push(suffix);
                if let Ok(meta) = std::fs::metadata(&path) {
                    total += meta.len();
                }
            }
            total
        })
        .await;

        match usage {
            Ok(usage) => StorageEstimate::new(usage, self.config().quota_bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Storage estimate unavailable; reporting unknown");
                StorageEstimate::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SqliteConfig, SqliteStore};
    use crate::ports::{BlobStore, StorageHealth};
    use osprey_core::models::PhotoId;

    #[tokio::test]
    async fn durability_granted_on_wal_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path().join("test.db"), 1024 * 1024);
        let store = SqliteStore::with_migrations(config).await.unwrap();
        assert!(store.request_durability().await);
    }

    #[tokio::test]
    async fn estimate_grows_with_stored_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path().join("test.db"), 64 * 1024 * 1024);
        let store = SqliteStore::with_migrations(config).await.unwrap();

        let before = store.estimate().await;
        store.save_blob(PhotoId::new(), &vec![7u8; 256 * 1024]).await.unwrap();
        let after = store.estimate().await;

        assert!(after.usage > before.usage);
        assert_eq!(after.quota, 64 * 1024 * 1024);
    }
}
