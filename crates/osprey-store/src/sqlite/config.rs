use std::path::PathBuf;

use osprey_core::config::OspreyConfig;

/// Configuration for the SQLite storage adapter.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file location.
    pub path: PathBuf,
    /// Byte budget reported by the health probe. SQLite itself has no
    /// quota; the budget is policy, enforced by surfacing percent-used to
    /// the operator.
    pub quota_bytes: u64,
    /// Connection pool size. The document is single-writer, so a small
    /// pool is enough; extra connections serve concurrent blob reads
    /// during export.
    pub max_connections: u32,
}

impl SqliteConfig {
    pub fn new(path: PathBuf, quota_bytes: u64) -> Self {
        Self { path, quota_bytes, max_connections: 4 }
    }
}

impl From<&OspreyConfig> for SqliteConfig {
    fn from(config: &OspreyConfig) -> Self {
        Self::new(config.sqlite_path(), config.quota_bytes)
    }
}
