use async_trait::async_trait;
use osprey_core::error::Result;
use osprey_core::models::{PhotoId, SiteSurvey, StorageEstimate};

/// Port for survey document persistence.
///
/// The document store is a passive persistence target: the session owns the
/// document and the store only ever sees full snapshots.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Serialize and durably commit the full survey under `key`,
    /// overwriting any prior value. Atomic: a failed write must never leave
    /// a partially-written or corrupted prior value observable on the next
    /// read.
    async fn save_document(&self, key: &str, survey: &SiteSurvey) -> Result<()>;

    /// Return the last committed document for `key`. Absence is `Ok(None)`,
    /// never an error.
    async fn load_document(&self, key: &str) -> Result<Option<SiteSurvey>>;

    /// Remove the document under `key`, if any.
    async fn delete_document(&self, key: &str) -> Result<()>;
}

/// Port for full-resolution photo binaries, keyed by photo id.
///
/// Blob writes commit independently of the document store's transaction
/// boundary. Each id is written at most once, so there is no cross-id
/// locking.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save_blob(&self, id: PhotoId, bytes: &[u8]) -> Result<()>;

    /// `Ok(None)` for a blob that was never written or has been evicted.
    async fn load_blob(&self, id: PhotoId) -> Result<Option<Vec<u8>>>;

    async fn delete_blob(&self, id: PhotoId) -> Result<()>;
}

/// Port for storage capacity and durability probes.
#[async_trait]
pub trait StorageHealth: Send + Sync {
    /// Ask the backend to exempt this storage from opportunistic eviction.
    /// Best-effort: returns whether the request was granted, and must not
    /// block any other operation on failure.
    async fn request_durability(&self) -> bool;

    /// Capacity snapshot. Never raises; backends return
    /// [`StorageEstimate::unknown`] when they cannot answer.
    async fn estimate(&self) -> StorageEstimate;
}
