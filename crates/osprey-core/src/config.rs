//! Layered configuration for Osprey: built-in defaults, then a TOML file,
//! then `OSPREY_*` environment variables, highest precedence last.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{OspreyError, Result};

/// Host runtime profile. Embedded-browser hosts get a generously longer
/// debounce window to trade data-loss exposure against battery and I/O
/// pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostProfile {
    Embedded,
    Desktop,
}

impl HostProfile {
    pub fn debounce(&self) -> Duration {
        match self {
            HostProfile::Embedded => Duration::from_millis(2000),
            HostProfile::Desktop => Duration::from_millis(1000),
        }
    }
}

/// Timing knobs for the autosave coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveTuning {
    /// Idle time after the last mutation before a save is attempted.
    pub debounce: Duration,
    /// Hard ceiling on one durable write; elapsing counts as failure.
    pub save_timeout: Duration,
    /// Delay before the post-save storage-health refresh, so rapid
    /// successive saves share one quota probe.
    pub health_refresh_delay: Duration,
}

impl AutosaveTuning {
    pub fn for_profile(profile: HostProfile) -> Self {
        Self {
            debounce: profile.debounce(),
            save_timeout: Duration::from_secs(8),
            health_refresh_delay: Duration::from_secs(2),
        }
    }
}

/// Versioned cache namespaces for the offline caching proxy. Any on-disk
/// generation whose name matches neither is purged on activation.
pub const SHELL_CACHE_NAME: &str = "osp-shell-v5";
pub const TILE_CACHE_NAME: &str = "osp-map-tiles-v1";

/// Full Osprey configuration.
#[derive(Debug, Clone)]
pub struct OspreyConfig {
    /// Root directory for the SQLite database and cache generations.
    pub data_dir: PathBuf,
    /// Byte budget for the storage backend; feeds the health estimate.
    pub quota_bytes: u64,
    pub host_profile: HostProfile,
    /// Destination for the tier-3 downloads fallback.
    pub downloads_dir: PathBuf,
    /// Listen address for the caching proxy.
    pub proxy_listen: String,
    /// Origin the proxy forwards shell and navigation requests to.
    pub upstream_origin: String,
    /// Hostname substring identifying map tile requests.
    pub tile_host: String,
    /// Shell asset paths precached and served cache-first.
    pub precache_paths: Vec<String>,
}

impl OspreyConfig {
    pub fn with_defaults() -> Self {
        Self {
            data_dir: PathBuf::from(".osprey"),
            quota_bytes: 10 * 1024 * 1024 * 1024,
            host_profile: HostProfile::Desktop,
            downloads_dir: PathBuf::from("downloads"),
            proxy_listen: "127.0.0.1:8400".to_string(),
            upstream_origin: "http://127.0.0.1:5173".to_string(),
            tile_host: "tile.openstreetmap.org".to_string(),
            precache_paths: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.webmanifest".to_string(),
            ],
        }
    }

    /// Load configuration from a TOML file, keeping defaults for any field
    /// the file omits.
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| OspreyError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| OspreyError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(data_dir) = file_config.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(quota_bytes) = file_config.quota_bytes {
            self.quota_bytes = quota_bytes;
        }
        if let Some(host_profile) = file_config.host_profile {
            self.host_profile = host_profile;
        }
        if let Some(downloads_dir) = file_config.downloads_dir {
            self.downloads_dir = downloads_dir;
        }
        if let Some(proxy) = file_config.proxy {
            if let Some(listen) = proxy.listen {
                self.proxy_listen = listen;
            }
            if let Some(upstream_origin) = proxy.upstream_origin {
                self.upstream_origin = upstream_origin;
            }
            if let Some(tile_host) = proxy.tile_host {
                self.tile_host = tile_host;
            }
            if let Some(precache_paths) = proxy.precache_paths {
                self.precache_paths = precache_paths;
            }
        }

        Ok(self)
    }

    /// Overlay environment variables on top of the current values.
    pub fn load_from_env(mut self) -> Self {
        if let Ok(dir) = env::var("OSPREY_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(quota_str) = env::var("OSPREY_QUOTA_BYTES") {
            match quota_str.parse::<u64>() {
                Ok(quota) => self.quota_bytes = quota,
                Err(_) => tracing::warn!(
                    "Invalid OSPREY_QUOTA_BYTES value '{}': expected byte count",
                    quota_str
                ),
            }
        }

        if let Ok(profile_str) = env::var("OSPREY_HOST_PROFILE") {
            match profile_str.to_lowercase().as_str() {
                "embedded" => self.host_profile = HostProfile::Embedded,
                "desktop" => self.host_profile = HostProfile::Desktop,
                _ => tracing::warn!(
                    "Invalid OSPREY_HOST_PROFILE value '{}': expected embedded or desktop",
                    profile_str
                ),
            }
        }

        if let Ok(dir) = env::var("OSPREY_DOWNLOADS_DIR") {
            self.downloads_dir = PathBuf::from(dir);
        }

        if let Ok(listen) = env::var("OSPREY_PROXY_LISTEN") {
            self.proxy_listen = listen;
        }

        if let Ok(origin) = env::var("OSPREY_UPSTREAM_ORIGIN") {
            self.upstream_origin = origin;
        }

        self
    }

    /// Resolve the final layered configuration: defaults, then the optional
    /// file, then the environment.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::with_defaults();
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(OspreyError::ConfigNotFound { path: path.to_path_buf() });
            }
            config = config.load_from_file(path)?;
        }
        Ok(config.load_from_env())
    }

    pub fn autosave_tuning(&self) -> AutosaveTuning {
        AutosaveTuning::for_profile(self.host_profile)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("osprey.db")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.data_dir.join("cache")
    }
}

impl Default for OspreyConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from the TOML file. Every field is optional so a
/// partial file overlays cleanly on the defaults.
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    quota_bytes: Option<u64>,
    host_profile: Option<HostProfile>,
    downloads_dir: Option<PathBuf>,
    proxy: Option<ProxyFileConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProxyFileConfig {
    listen: Option<String>,
    upstream_origin: Option<String>,
    tile_host: Option<String>,
    precache_paths: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_profile_doubles_debounce() {
        assert_eq!(HostProfile::Embedded.debounce(), Duration::from_millis(2000));
        assert_eq!(HostProfile::Desktop.debounce(), Duration::from_millis(1000));
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "quota_bytes = 1024\n\n[proxy]\ntile_host = \"tiles.example.com\"")
            .unwrap();

        let config = OspreyConfig::with_defaults().load_from_file(file.path()).unwrap();
        assert_eq!(config.quota_bytes, 1024);
        assert_eq!(config.tile_host, "tiles.example.com");
        // Untouched fields keep their defaults
        assert_eq!(config.host_profile, HostProfile::Desktop);
        assert_eq!(config.proxy_listen, "127.0.0.1:8400");
    }

    #[test]
    fn missing_config_file_is_an_explicit_error() {
        let result = OspreyConfig::resolve(Some(Path::new("/nonexistent/osprey.toml")));
        assert!(matches!(result, Err(OspreyError::ConfigNotFound { .. })));
    }
}
