//! Export command implementation

use anyhow::Result;

use osprey_core::config::OspreyConfig;
use osprey_core::ports::AlwaysLicensed;
use osprey_core::OspreyError;
use osprey_export::deliver::DownloadsFallbackTier;
use osprey_export::{default_tiers, export_project, DeliveryOutcome, DeliveryTier};
use osprey_session::OperationKind;

use crate::cli::{ExportArgs, StorageBackend};
use crate::output::OutputWriter;

use super::open_session;

pub async fn execute(
    args: ExportArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (session, storage) = open_session(backend, config).await?;

    // Export is the one license-gated operation. The default backend treats
    // every install as active until an activation flow is wired in.
    let license = session.check_license(&AlwaysLicensed).await;
    if !license.active {
        output.warning("Export requires an active license");
        session.close().await;
        return Ok(());
    }

    if session.survey().poles.is_empty() {
        output.warning("Nothing to export: the project has no poles");
        session.close().await;
        return Ok(());
    }

    let downloads_dir = args.output.unwrap_or_else(|| config.downloads_dir.clone());
    let tiers: Vec<Box<dyn DeliveryTier>> = if args.no_prompt || output.is_json() {
        vec![Box::new(DownloadsFallbackTier { downloads_dir: downloads_dir.clone() })]
    } else {
        default_tiers(downloads_dir.clone())
    };

    let token = session.scopes().begin(OperationKind::Export);
    let result = export_project(session.survey(), storage.blobs.as_ref(), &tiers, &token).await;

    match result {
        Ok(DeliveryOutcome::Delivered) => {
            output.success(format!("Archive delivered (fallback directory: {})", downloads_dir.display()));
        }
        Ok(DeliveryOutcome::Cancelled) | Err(OspreyError::Cancelled) => {
            // A user-initiated abort is a clean outcome, not a failure.
            output.info("Export cancelled");
        }
        Ok(DeliveryOutcome::Unavailable) | Err(OspreyError::DeliveryExhausted) => {
            output.warning("No delivery mechanism could place the archive");
        }
        Err(e) => {
            session.close().await;
            return Err(e.into());
        }
    }

    session.close().await;
    Ok(())
}
