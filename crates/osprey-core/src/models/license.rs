//! Licensing check result, consumed from the host's activation backend.

use serde::{Deserialize, Serialize};

/// Result of the licensing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStatus {
    pub active: bool,
    pub days_left: Option<i64>,
}

impl LicenseStatus {
    /// Status used until a check has completed, and when the check fails.
    pub fn inactive() -> Self {
        Self { active: false, days_left: None }
    }
}
