//! DocumentStore implementation for SQLite

use async_trait::async_trait;
use chrono::Utc;
use osprey_core::error::{OspreyError, Result};
use osprey_core::models::SiteSurvey;

use super::SqliteStore;
use crate::ports::DocumentStore;

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save_document(&self, key: &str, survey: &SiteSurvey) -> Result<()> {
        let body = serde_json::to_string(survey)?;

        // A single upsert inside a transaction: either the new snapshot
        // commits whole, or the prior committed value stays observable.
        let mut tx = self.pool().begin().await.map_err(|e| OspreyError::StorageWrite {
            key: key.to_string(),
            reason: format!("Failed to begin transaction: {}", e),
        })?;

        sqlx::query(
            "INSERT INTO documents (key, body, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| OspreyError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        tx.commit().await.map_err(|e| OspreyError::StorageWrite {
            key: key.to_string(),
            reason: format!("Failed to commit: {}", e),
        })
    }

    async fn load_document(&self, key: &str) -> Result<Option<SiteSurvey>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE key = ?1")
                .bind(key)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| OspreyError::StorageRead {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn delete_document(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE key = ?1")
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(|e| OspreyError::StorageWrite {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SqliteConfig, SqliteStore};
    use crate::ports::DocumentStore;
    use osprey_core::models::{PoleSurvey, SiteSurvey};
    use osprey_core::DOCUMENT_KEY;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteStore {
        let config = SqliteConfig::new(dir.path().join("test.db"), 1024 * 1024);
        SqliteStore::with_migrations(config).await.unwrap()
    }

    #[tokio::test]
    async fn absent_document_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        assert!(store.load_document(DOCUMENT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn document_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut survey = SiteSurvey::new_project();
        survey.site_name = "MAIN ST".to_string();
        survey
            .poles
            .push(PoleSurvey::at("POLE-001".into(), 40.0, -75.0, None).unwrap());

        {
            let store = open_store(&dir).await;
            store.save_document(DOCUMENT_KEY, &survey).await.unwrap();
        }

        let store = open_store(&dir).await;
        let loaded = store.load_document(DOCUMENT_KEY).await.unwrap().unwrap();
        assert_eq!(loaded, survey);
    }

    #[tokio::test]
    async fn save_overwrites_under_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let mut survey = SiteSurvey::new_project();
        store.save_document(DOCUMENT_KEY, &survey).await.unwrap();

        survey.site_name = "RIDGE RD".to_string();
        store.save_document(DOCUMENT_KEY, &survey).await.unwrap();

        let loaded = store.load_document(DOCUMENT_KEY).await.unwrap().unwrap();
        assert_eq!(loaded.site_name, "RIDGE RD");
    }
}
