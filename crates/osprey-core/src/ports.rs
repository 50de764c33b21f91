use async_trait::async_trait;

use crate::error::Result;
use crate::models::LicenseStatus;

/// Port for the licensing collaborator. Export is gated on an active
/// license; everything else works without one.
#[async_trait]
pub trait LicenseService: Send + Sync {
    async fn subscription_status(&self) -> Result<LicenseStatus>;
}

/// License backend that treats every install as active. Used when the
/// activation flow is not wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysLicensed;

#[async_trait]
impl LicenseService for AlwaysLicensed {
    async fn subscription_status(&self) -> Result<LicenseStatus> {
        Ok(LicenseStatus { active: true, days_left: None })
    }
}
