//! Osprey Export - Archive compilation and delivery
//!
//! Compiles the survey document and blob store into the hierarchical
//! project package and hands it to the user through an ordered chain of
//! delivery tiers.

pub mod archive;
pub mod deliver;
pub mod kml;
pub mod sanitize;

pub use archive::{compile_archive, generate_report_package, CompiledArchive};
pub use deliver::{default_tiers, deliver_archive, DeliveryOutcome, DeliveryTier};
pub use sanitize::sanitize;

use osprey_core::error::{OspreyError, Result};
use osprey_core::models::SiteSurvey;
use osprey_session::CancelToken;
use osprey_store::ports::BlobStore;

/// One-shot export: compile the archive and run the delivery chain. The
/// caller's cancellation token short-circuits both halves; a cancellation
/// is reported as [`OspreyError::Cancelled`], never as a user-visible
/// failure.
pub async fn export_project(
    site: &SiteSurvey,
    blobs: &dyn BlobStore,
    tiers: &[Box<dyn DeliveryTier>],
    token: &CancelToken,
) -> Result<DeliveryOutcome> {
    if token.is_cancelled() {
        return Err(OspreyError::Cancelled);
    }

    let compiled = compile_archive(site, blobs).await?;

    if token.is_cancelled() {
        return Err(OspreyError::Cancelled);
    }

    deliver_archive(&compiled, tiers, token).await
}
