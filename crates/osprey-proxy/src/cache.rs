//! Versioned on-disk cache namespaces.
//!
//! Each cache generation is one directory named after its version
//! identifier. Entries are keyed by the SHA-256 of the request URL, stored
//! as a body file plus a small metadata sidecar holding the content type.
//! On activation, every generation directory that matches none of the
//! current version identifiers is purged, so cache growth is bounded
//! across upgrades.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use osprey_core::error::Result;

/// A cached response body with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// One named cache generation on disk.
#[derive(Debug, Clone)]
pub struct CacheNamespace {
    name: String,
    dir: PathBuf,
}

impl CacheNamespace {
    pub async fn open(root: &Path, name: &str) -> Result<Self> {
        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { name: name.to_string(), dir })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = hex::encode(Sha256::digest(url.as_bytes()));
        (self.dir.join(format!("{key}.body")), self.dir.join(format!("{key}.meta")))
    }

    /// Look up a cached response. Corrupt or half-written entries read as
    /// misses.
    pub async fn get(&self, url: &str) -> Option<CachedResponse> {
        let (body_path, meta_path) = self.entry_paths(url);
        let body = tokio::fs::read(&body_path).await.ok()?;
        let content_type = tokio::fs::read_to_string(&meta_path).await.ok()?;
        Some(CachedResponse { content_type: content_type.trim().to_string(), body })
    }

    /// Store a response. The body lands through a temporary sibling and a
    /// rename so a crash mid-write never leaves a torn entry behind its
    /// metadata.
    pub async fn put(&self, url: &str, content_type: &str, body: &[u8]) -> Result<()> {
        let (body_path, meta_path) = self.entry_paths(url);
        let part_path = body_path.with_extension("part");

        tokio::fs::write(&part_path, body).await?;
        tokio::fs::rename(&part_path, &body_path).await?;
        tokio::fs::write(&meta_path, content_type).await?;
        Ok(())
    }
}

/// Delete every cache generation under `root` whose directory name matches
/// none of `keep`. Runs on activation.
pub async fn purge_stale_generations(root: &Path, keep: &[&str]) -> Result<()> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        // No cache root yet means nothing to purge.
        Err(_) => return Ok(()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if entry.file_type().await?.is_dir() && !keep.contains(&name.as_ref()) {
            tracing::info!(generation = %name, "Purging stale cache generation");
            tokio::fs::remove_dir_all(entry.path()).await?;
        }
    }
    Ok(())
}
