//! In-memory storage implementations for development and testing.
//!
//! These implementations use `RwLock::unwrap()` intentionally. Lock
//! poisoning only occurs when another thread panicked while holding the
//! lock, which is an unrecoverable state. For durable workloads, use the
//! SQLite backend.

use async_trait::async_trait;
use osprey_core::error::Result;
use osprey_core::models::{PhotoId, SiteSurvey, StorageEstimate};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ports::{BlobStore, DocumentStore, StorageHealth};

/// In-memory implementation of DocumentStore
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn save_document(&self, key: &str, survey: &SiteSurvey) -> Result<()> {
        // Serialize before taking the lock so a failure leaves the prior
        // committed value untouched.
        let body = serde_json::to_string(survey)?;
        let mut documents = self.documents.write().unwrap();
        documents.insert(key.to_string(), body);
        Ok(())
    }

    async fn load_document(&self, key: &str) -> Result<Option<SiteSurvey>> {
        let body = {
            let documents = self.documents.read().unwrap();
            documents.get(key).cloned()
        };
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn delete_document(&self, key: &str) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        documents.remove(key);
        Ok(())
    }
}

/// In-memory implementation of BlobStore
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<PhotoId, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held. Test helper.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save_blob(&self, id: PhotoId, bytes: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert(id, bytes.to_vec());
        Ok(())
    }

    async fn load_blob(&self, id: PhotoId) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.get(&id).cloned())
    }

    async fn delete_blob(&self, id: PhotoId) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.remove(&id);
        Ok(())
    }
}

/// In-memory storage health probe with a fixed quota
#[derive(Debug, Clone)]
pub struct MemoryStorageHealth {
    quota: u64,
    documents: MemoryDocumentStore,
    blobs: MemoryBlobStore,
}

impl MemoryStorageHealth {
    pub fn new(quota: u64, documents: MemoryDocumentStore, blobs: MemoryBlobStore) -> Self {
        Self { quota, documents, blobs }
    }
}

#[async_trait]
impl StorageHealth for MemoryStorageHealth {
    async fn request_durability(&self) -> bool {
        // Process memory is never subject to disk-pressure eviction.
        true
    }

    async fn estimate(&self) -> StorageEstimate {
        let doc_bytes: u64 = {
            let documents = self.documents.documents.read().unwrap();
            documents.values().map(|body| body.len() as u64).sum()
        };
        let blob_bytes: u64 = {
            let blobs = self.blobs.blobs.read().unwrap();
            blobs.values().map(|bytes| bytes.len() as u64).sum()
        };
        StorageEstimate::new(doc_bytes + blob_bytes, self.quota)
    }
}
