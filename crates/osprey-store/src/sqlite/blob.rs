//! BlobStore implementation for SQLite

use async_trait::async_trait;
use chrono::Utc;
use osprey_core::error::{OspreyError, Result};
use osprey_core::models::PhotoId;

use super::SqliteStore;
use crate::ports::BlobStore;

#[async_trait]
impl BlobStore for SqliteStore {
    async fn save_blob(&self, id: PhotoId, bytes: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO blobs (id, bytes, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET bytes = excluded.bytes",
        )
        .bind(id.to_string())
        .bind(bytes)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| OspreyError::BlobWrite { id: id.to_string(), reason: e.to_string() })?;
        Ok(())
    }

    async fn load_blob(&self, id: PhotoId) -> Result<Option<Vec<u8>>> {
        sqlx::query_scalar("SELECT bytes FROM blobs WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| OspreyError::StorageRead {
                key: id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn delete_blob(&self, id: PhotoId) -> Result<()> {
        sqlx::query("DELETE FROM blobs WHERE id = ?1")
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(|e| OspreyError::StorageWrite {
                key: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
