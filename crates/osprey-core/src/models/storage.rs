use serde::{Deserialize, Serialize};

/// Snapshot of storage capacity, recomputed on demand and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageEstimate {
    /// Bytes currently used by the document and blob stores.
    pub usage: u64,
    /// Bytes the backend is allowed to occupy.
    pub quota: u64,
    /// Usage as a percentage of quota, clamped to [0, 100].
    pub percent: f64,
}

impl StorageEstimate {
    pub fn new(usage: u64, quota: u64) -> Self {
        let percent = if quota == 0 {
            0.0
        } else {
            (usage as f64 / quota as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self { usage, quota, percent }
    }

    /// Fallback when the backend cannot answer. Health probes never raise.
    pub fn unknown() -> Self {
        Self { usage: 0, quota: 0, percent: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(StorageEstimate::new(50, 100).percent, 50.0);
        assert_eq!(StorageEstimate::new(300, 100).percent, 100.0);
        assert_eq!(StorageEstimate::new(10, 0).percent, 0.0);
    }
}
