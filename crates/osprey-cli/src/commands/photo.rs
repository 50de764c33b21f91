//! Photo command implementations

use anyhow::{Context, Result};
use base64::Engine;

use osprey_core::config::OspreyConfig;
use osprey_core::models::{PhotoStatus, PhotoUpdate};

use crate::cli::{PhotoArgs, PhotoAttachArgs, PhotoCommand, PhotoReviewArgs, ReviewVerdict, StorageBackend};
use crate::output::OutputWriter;

use super::{open_session, resolve_pole};

pub async fn execute(
    args: PhotoArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    match args.command {
        PhotoCommand::Attach(args) => attach(args, backend, config, output).await,
        PhotoCommand::Review(args) => review(args, backend, config, output).await,
    }
}

async fn attach(
    args: PhotoAttachArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;
    let pole_id = resolve_pole(session.survey(), &args.pole)?;

    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Cannot read photo file {}", args.path.display()))?;

    // Inline preview goes into the document; the full-resolution binary
    // only ever lives in the blob store.
    let thumbnail = match &args.preview {
        Some(preview_path) => {
            let preview = tokio::fs::read(preview_path)
                .await
                .with_context(|| format!("Cannot read preview file {}", preview_path.display()))?;
            base64::engine::general_purpose::STANDARD.encode(preview)
        }
        None => String::new(),
    };

    let captured = args.lat.zip(args.lng);
    let photo_id = session.attach_photo(pole_id, &bytes, thumbnail, captured).await?;

    let index = session
        .survey()
        .pole(pole_id)
        .map(|pole| pole.photos.len())
        .unwrap_or_default();
    output.success(format!("Attached photo {index} to {} ({photo_id})", args.pole));

    session.close().await;
    Ok(())
}

async fn review(
    args: PhotoReviewArgs,
    backend: &StorageBackend,
    config: &OspreyConfig,
    output: &OutputWriter,
) -> Result<()> {
    let (mut session, _storage) = open_session(backend, config).await?;
    let pole_id = resolve_pole(session.survey(), &args.pole)?;

    let photo_id = session
        .survey()
        .pole(pole_id)
        .and_then(|pole| {
            args.photo.checked_sub(1).and_then(|index| pole.photos.get(index)).map(|photo| photo.id)
        })
        .ok_or_else(|| anyhow::anyhow!("{} has no photo #{}", args.pole, args.photo))?;

    let status = args.status.map(|verdict| match verdict {
        ReviewVerdict::Pending => PhotoStatus::Pending,
        ReviewVerdict::Passed => PhotoStatus::Passed,
        ReviewVerdict::Retake => PhotoStatus::Retake,
    });
    session.update_photo(pole_id, photo_id, PhotoUpdate { status, remarks: args.remarks.map(Some) })?;

    output.success(format!("Recorded review on {} photo #{}", args.pole, args.photo));

    session.close().await;
    Ok(())
}
