//! Offline caching proxy server.
//!
//! Fronts the application origin and the tile host, applying one caching
//! strategy per resource class so the app keeps working without a
//! network: shell assets are cache-first, navigations fall back to the
//! cached shell, tiles are served stale and revalidated in the
//! background.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

use osprey_core::config::{OspreyConfig, SHELL_CACHE_NAME, TILE_CACHE_NAME};
use osprey_core::error::Result;

use crate::cache::{purge_stale_generations, CacheNamespace, CachedResponse};
use crate::classify::{classify, ResourceClass};
use crate::strategy::{self, HttpUpstream, Upstream};

/// Local path prefix under which tile requests are intercepted.
pub const TILE_PREFIX: &str = "/tiles/";

#[derive(Clone)]
pub struct ProxyState {
    pub shell: Arc<CacheNamespace>,
    pub tiles: Arc<CacheNamespace>,
    pub upstream: Arc<dyn Upstream>,
    pub upstream_origin: String,
    pub tile_host: String,
}

impl ProxyState {
    /// Open the current cache generations, drop every stale one, and
    /// warm the shell cache with the precache list.
    pub async fn activate(config: &OspreyConfig, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let cache_root = config.cache_root();
        let shell = Arc::new(CacheNamespace::open(&cache_root, SHELL_CACHE_NAME).await?);
        let tiles = Arc::new(CacheNamespace::open(&cache_root, TILE_CACHE_NAME).await?);

        purge_stale_generations(&cache_root, &[SHELL_CACHE_NAME, TILE_CACHE_NAME]).await?;

        let state = Self {
            shell,
            tiles,
            upstream,
            upstream_origin: config.upstream_origin.clone(),
            tile_host: config.tile_host.clone(),
        };

        for path in &config.precache_paths {
            let url = state.origin_url(path);
            match strategy::cache_first(&state.shell, state.upstream.as_ref(), &url).await {
                Ok(_) => tracing::debug!(%path, "Precached shell asset"),
                Err(e) => tracing::warn!(%path, error = %e, "Precache fetch failed"),
            }
        }
        tracing::info!(
            shell = SHELL_CACHE_NAME,
            tiles = TILE_CACHE_NAME,
            "Cache generations activated"
        );

        Ok(state)
    }

    fn origin_url(&self, path: &str) -> String {
        format!("{}{}", self.upstream_origin.trim_end_matches('/'), path)
    }

    fn tile_url(&self, path: &str) -> String {
        let rest = path.strip_prefix(TILE_PREFIX).unwrap_or(path);
        format!("https://{}/{}", self.tile_host, rest)
    }

    fn fallback_url(&self) -> String {
        self.origin_url("/index.html")
    }
}

pub fn create_router(state: Arc<ProxyState>) -> Router {
    Router::new().fallback(intercept).with_state(state)
}

/// Start the proxy on the configured listen address. Runs until the
/// process is stopped.
pub async fn run(config: &OspreyConfig) -> Result<()> {
    let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new());
    let state = Arc::new(ProxyState::activate(config, upstream).await?);
    let app = create_router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.proxy_listen).await?;
    tracing::info!(listen = %config.proxy_listen, upstream = %config.upstream_origin, "Proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn intercept(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path().to_string();
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or(path.clone());
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());

    let served = match classify(method.as_str(), &path, accept, TILE_PREFIX) {
        ResourceClass::Shell => {
            let url = state.origin_url(&path_and_query);
            strategy::cache_first(&state.shell, state.upstream.as_ref(), &url).await
        }
        ResourceClass::Navigation => {
            let url = state.origin_url(&path_and_query);
            strategy::network_first(
                &state.shell,
                state.upstream.as_ref(),
                &url,
                &state.fallback_url(),
            )
            .await
        }
        ResourceClass::Tile => {
            let url = state.tile_url(&path);
            strategy::stale_while_revalidate(
                Arc::clone(&state.tiles),
                Arc::clone(&state.upstream),
                &url,
            )
            .await
        }
        // Mutating requests never touch a cache and are not proxied here.
        ResourceClass::Bypass => {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
    };

    match served {
        Ok(cached) => respond(cached),
        Err(e) => {
            tracing::debug!(%path, error = %e, "Request unserveable");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

fn respond(cached: CachedResponse) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, cached.content_type)
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    use osprey_core::error::OspreyError;

    struct FakeUpstream {
        offline: AtomicBool,
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn fetch(&self, url: &str) -> osprey_core::error::Result<CachedResponse> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(OspreyError::StorageRead {
                    key: url.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(CachedResponse {
                content_type: "text/plain".to_string(),
                body: format!("body-of:{url}").into_bytes(),
            })
        }
    }

    async fn test_state(root: &std::path::Path) -> (Arc<ProxyState>, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream { offline: AtomicBool::new(false) });
        let mut config = OspreyConfig::with_defaults();
        config.data_dir = root.to_path_buf();
        config.precache_paths = vec![];
        let state = ProxyState::activate(&config, upstream.clone()).await.unwrap();
        (Arc::new(state), upstream)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn shell_asset_survives_going_offline() {
        let root = tempfile::tempdir().unwrap();
        let (state, upstream) = test_state(root.path()).await;
        let router = create_router(state);

        let (status, first) = get(&router, "/assets/index.js").await;
        assert_eq!(status, StatusCode::OK);

        upstream.offline.store(true, Ordering::SeqCst);
        let (status, second) = get(&router, "/assets/index.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn offline_launch_serves_the_cached_shell() {
        let root = tempfile::tempdir().unwrap();
        let (state, upstream) = test_state(root.path()).await;
        let router = create_router(Arc::clone(&state));

        // Seed the shell document while online, then launch offline.
        let (status, _) = get(&router, "/index.html").await;
        assert_eq!(status, StatusCode::OK);
        upstream.offline.store(true, Ordering::SeqCst);

        let (status, body) = get(&router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("/index.html"));
    }

    #[tokio::test]
    async fn tiles_map_onto_the_tile_host() {
        let root = tempfile::tempdir().unwrap();
        let (state, _) = test_state(root.path()).await;
        let router = create_router(state);

        let (status, body) = get(&router, "/tiles/12/1205/1539.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "body-of:https://tile.openstreetmap.org/12/1205/1539.png"
        );
    }

    #[tokio::test]
    async fn offline_with_nothing_cached_is_a_bad_gateway() {
        let root = tempfile::tempdir().unwrap();
        let (state, upstream) = test_state(root.path()).await;
        let router = create_router(state);
        upstream.offline.store(true, Ordering::SeqCst);

        let (status, _) = get(&router, "/assets/never-seen.js").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn mutating_requests_are_not_intercepted() {
        let root = tempfile::tempdir().unwrap();
        let (state, _) = test_state(root.path()).await;
        let router = create_router(state);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
