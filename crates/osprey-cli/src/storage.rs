use anyhow::{Context, Result};
use std::sync::Arc;

use osprey_core::config::OspreyConfig;
use osprey_store::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryStorageHealth};
use osprey_store::ports::{BlobStore, DocumentStore, StorageHealth};
use osprey_store::sqlite::{SqliteConfig, SqliteStore};

use crate::cli::StorageBackend;

pub struct Storage {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub health: Arc<dyn StorageHealth>,
}

impl Storage {
    pub async fn new(backend: &StorageBackend, config: &OspreyConfig) -> Result<Self> {
        match backend {
            StorageBackend::Memory => Ok(Self::new_memory(config.quota_bytes)),
            StorageBackend::Sqlite => Self::new_sqlite(config).await,
        }
    }

    /// Create in-memory storage adapters
    fn new_memory(quota_bytes: u64) -> Self {
        let documents = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let health = MemoryStorageHealth::new(quota_bytes, documents.clone(), blobs.clone());
        Self {
            documents: Arc::new(documents),
            blobs: Arc::new(blobs),
            health: Arc::new(health),
        }
    }

    /// Create SQLite storage adapters
    async fn new_sqlite(config: &OspreyConfig) -> Result<Self> {
        let sqlite_config = SqliteConfig::from(config);
        let path = sqlite_config.path.clone();

        let store =
            SqliteStore::with_migrations(sqlite_config).await.map(Arc::new).with_context(|| {
                format!(
                    "Failed to open the survey database at {}.\n\
                     Check that the data directory exists and is writable,\n\
                     or pass --storage memory for a throwaway session.",
                    path.display()
                )
            })?;

        Ok(Self { documents: store.clone(), blobs: store.clone(), health: store })
    }
}
