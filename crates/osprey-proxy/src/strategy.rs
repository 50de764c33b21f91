//! Resource-class caching strategies over an abstract upstream fetcher.

use std::sync::Arc;

use async_trait::async_trait;

use osprey_core::error::{OspreyError, Result};

use crate::cache::{CacheNamespace, CachedResponse};
use crate::classify::is_retrievable;

/// Abstract network fetcher, so strategies are testable without sockets.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CachedResponse>;
}

/// Upstream backed by reqwest.
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, url: &str) -> Result<CachedResponse> {
        if !is_retrievable(url) {
            return Err(OspreyError::StorageRead {
                key: url.to_string(),
                reason: "non-retrievable scheme".to_string(),
            });
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            OspreyError::StorageRead { key: url.to_string(), reason: e.to_string() }
        })?;

        if !response.status().is_success() {
            return Err(OspreyError::StorageRead {
                key: url.to_string(),
                reason: format!("upstream status {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response.bytes().await.map_err(|e| OspreyError::StorageRead {
            key: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(CachedResponse { content_type, body: body.to_vec() })
    }
}

/// Cache-first with network refill: serve from cache immediately if
/// present, otherwise fetch and populate.
pub async fn cache_first(
    cache: &CacheNamespace,
    upstream: &dyn Upstream,
    url: &str,
) -> Result<CachedResponse> {
    if let Some(hit) = cache.get(url).await {
        return Ok(hit);
    }
    let fetched = upstream.fetch(url).await?;
    cache.put(url, &fetched.content_type, &fetched.body).await?;
    Ok(fetched)
}

/// Network-first with a cached fallback document, so navigations keep
/// working offline.
pub async fn network_first(
    cache: &CacheNamespace,
    upstream: &dyn Upstream,
    url: &str,
    fallback_url: &str,
) -> Result<CachedResponse> {
    match upstream.fetch(url).await {
        Ok(fetched) => {
            cache.put(url, &fetched.content_type, &fetched.body).await?;
            Ok(fetched)
        }
        Err(network_err) => {
            if let Some(hit) = cache.get(url).await {
                return Ok(hit);
            }
            if let Some(shell) = cache.get(fallback_url).await {
                tracing::debug!(%url, "Offline navigation served from cached shell");
                return Ok(shell);
            }
            Err(network_err)
        }
    }
}

/// Stale-while-revalidate: serve any cached copy immediately and refresh
/// the cache in a background task. The response never blocks on the
/// network when a cached copy exists.
pub async fn stale_while_revalidate(
    cache: Arc<CacheNamespace>,
    upstream: Arc<dyn Upstream>,
    url: &str,
) -> Result<CachedResponse> {
    let cached = cache.get(url).await;

    let refresh_url = url.to_string();
    let refresh_cache = Arc::clone(&cache);
    let refresh_upstream = Arc::clone(&upstream);
    let revalidate = async move {
        match refresh_upstream.fetch(&refresh_url).await {
            Ok(fetched) => {
                if let Err(e) =
                    refresh_cache.put(&refresh_url, &fetched.content_type, &fetched.body).await
                {
                    tracing::warn!(url = %refresh_url, error = %e, "Tile cache refresh failed");
                }
                Some(fetched)
            }
            Err(e) => {
                tracing::debug!(url = %refresh_url, error = %e, "Tile revalidation failed");
                None
            }
        }
    };

    match cached {
        Some(hit) => {
            tokio::spawn(revalidate);
            Ok(hit)
        }
        // Nothing cached yet: the network fetch is the response.
        None => revalidate.await.ok_or_else(|| OspreyError::StorageRead {
            key: url.to_string(),
            reason: "tile unavailable and not cached".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted upstream: serves a fixed body, counts fetches, can be
    /// taken offline.
    struct FakeUpstream {
        body: Mutex<Vec<u8>>,
        offline: AtomicBool,
        fetches: AtomicUsize,
    }

    impl FakeUpstream {
        fn serving(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: Mutex::new(body.to_vec()),
                offline: AtomicBool::new(false),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn fetch(&self, url: &str) -> Result<CachedResponse> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(OspreyError::StorageRead {
                    key: url.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(CachedResponse {
                content_type: "application/octet-stream".to_string(),
                body: self.body.lock().unwrap().clone(),
            })
        }
    }

    async fn open_cache(root: &tempfile::TempDir, name: &str) -> Arc<CacheNamespace> {
        Arc::new(CacheNamespace::open(root.path(), name).await.unwrap())
    }

    #[tokio::test]
    async fn cache_first_fetches_once_then_serves_locally() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "shell").await;
        let upstream = FakeUpstream::serving(b"app-shell");

        let first = cache_first(&cache, upstream.as_ref(), "https://o/app.js").await.unwrap();
        let second = cache_first(&cache, upstream.as_ref(), "https://o/app.js").await.unwrap();

        assert_eq!(first.body, b"app-shell");
        assert_eq!(second.body, b"app-shell");
        assert_eq!(upstream.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offline_navigation_falls_back_to_cached_shell() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "shell").await;
        let upstream = FakeUpstream::serving(b"<html>shell</html>");

        // Populate the shell while online, then go offline.
        cache.put("https://o/index.html", "text/html", b"<html>shell</html>").await.unwrap();
        upstream.offline.store(true, Ordering::SeqCst);

        let served = network_first(
            &cache,
            upstream.as_ref(),
            "https://o/deep/link",
            "https://o/index.html",
        )
        .await
        .unwrap();

        assert_eq!(served.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn navigation_prefers_the_network_when_reachable() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "shell").await;
        let upstream = FakeUpstream::serving(b"fresh");
        cache.put("https://o/", "text/html", b"stale").await.unwrap();

        let served =
            network_first(&cache, upstream.as_ref(), "https://o/", "https://o/index.html")
                .await
                .unwrap();

        assert_eq!(served.body, b"fresh");
        // And the cache was refilled for the next offline launch.
        assert_eq!(cache.get("https://o/").await.unwrap().body, b"fresh");
    }

    #[tokio::test]
    async fn stale_tile_is_served_immediately_and_revalidated() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "tiles").await;
        let upstream = FakeUpstream::serving(b"new-tile");
        cache.put("https://t/1/2/3.png", "image/png", b"old-tile").await.unwrap();

        let served =
            stale_while_revalidate(Arc::clone(&cache), upstream.clone(), "https://t/1/2/3.png")
                .await
                .unwrap();
        assert_eq!(served.body, b"old-tile");

        // Give the background refresh a moment to land.
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if cache.get("https://t/1/2/3.png").await.unwrap().body == b"new-tile" {
                break;
            }
        }
        assert_eq!(cache.get("https://t/1/2/3.png").await.unwrap().body, b"new-tile");
    }

    #[tokio::test]
    async fn uncached_tile_waits_for_the_network() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "tiles").await;
        let upstream = FakeUpstream::serving(b"tile");

        let served =
            stale_while_revalidate(Arc::clone(&cache), upstream.clone(), "https://t/9/9/9.png")
                .await
                .unwrap();

        assert_eq!(served.body, b"tile");
        assert_eq!(cache.get("https://t/9/9/9.png").await.unwrap().body, b"tile");
    }

    #[tokio::test]
    async fn offline_uncached_tile_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let cache = open_cache(&root, "tiles").await;
        let upstream = FakeUpstream::serving(b"tile");
        upstream.offline.store(true, Ordering::SeqCst);

        let result =
            stale_while_revalidate(Arc::clone(&cache), upstream.clone(), "https://t/0/0/0.png")
                .await;
        assert!(result.is_err());
    }
}
