//! Export delivery strategy.
//!
//! Three delivery tiers tried in order. A tier either terminates the
//! operation (delivered, or a clean user cancellation) or falls through to
//! the next. A host lacking a mechanism is expected, triggers fallback, and
//! is not logged as an error.

use std::path::PathBuf;

use async_trait::async_trait;

use osprey_core::error::{OspreyError, Result};
use osprey_session::CancelToken;

use crate::archive::CompiledArchive;

/// Terminal result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The archive reached a destination the user chose (or the fallback).
    Delivered,
    /// The user dismissed the prompt or share sheet. A clean termination,
    /// not a failure.
    Cancelled,
    /// The mechanism does not exist in this host; try the next tier.
    Unavailable,
}

/// One mechanism in the ordered fallback chain.
#[async_trait]
pub trait DeliveryTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, archive: &CompiledArchive) -> Result<DeliveryOutcome>;
}

/// Run the fallback chain. A whole-operation cancellation short-circuits
/// before any tier executes and is reported as [`OspreyError::Cancelled`],
/// which callers suppress from user-facing alerts.
pub async fn deliver_archive(
    archive: &CompiledArchive,
    tiers: &[Box<dyn DeliveryTier>],
    token: &CancelToken,
) -> Result<DeliveryOutcome> {
    if token.is_cancelled() {
        return Err(OspreyError::Cancelled);
    }

    for tier in tiers {
        if token.is_cancelled() {
            return Err(OspreyError::Cancelled);
        }
        match tier.deliver(archive).await {
            Ok(DeliveryOutcome::Delivered) => {
                tracing::info!(tier = tier.name(), file = %archive.file_name, "Archive delivered");
                return Ok(DeliveryOutcome::Delivered);
            }
            Ok(DeliveryOutcome::Cancelled) => {
                tracing::info!(tier = tier.name(), "Export cancelled by user");
                return Ok(DeliveryOutcome::Cancelled);
            }
            Ok(DeliveryOutcome::Unavailable) => {
                tracing::debug!(tier = tier.name(), "Delivery tier unavailable; falling through");
            }
            Err(e) => {
                tracing::warn!(tier = tier.name(), error = %e, "Delivery tier failed; falling through");
            }
        }
    }

    Err(OspreyError::DeliveryExhausted)
}

/// The default chain: save-picker, then share handoff, then the downloads
/// fallback that works in nearly every host.
pub fn default_tiers(downloads_dir: PathBuf) -> Vec<Box<dyn DeliveryTier>> {
    let staging_dir = std::env::temp_dir();
    vec![
        Box::new(SavePickerTier),
        Box::new(ShareHandoffTier { staging_dir }),
        Box::new(DownloadsFallbackTier { downloads_dir }),
    ]
}

/// Tier 1: interactive "save to location". Only available on an attended
/// terminal; the prompt suggests the final filename and a dismissed prompt
/// is a cancellation.
pub struct SavePickerTier;

#[async_trait]
impl DeliveryTier for SavePickerTier {
    fn name(&self) -> &'static str {
        "save-picker"
    }

    async fn deliver(&self, archive: &CompiledArchive) -> Result<DeliveryOutcome> {
        if !console::user_attended() {
            return Ok(DeliveryOutcome::Unavailable);
        }

        let suggested = archive.file_name.clone();
        let picked = tokio::task::spawn_blocking(move || {
            dialoguer::Input::<String>::new()
                .with_prompt("Save archive to")
                .default(suggested)
                .interact_text()
        })
        .await
        .map_err(|e| OspreyError::Archive { reason: e.to_string() })?;

        // An empty answer accepts the suggested filename; a dismissed
        // prompt (EOF, ^C) is a cancellation, not a failure.
        let destination = match picked {
            Ok(path) => PathBuf::from(path),
            Err(_) => return Ok(DeliveryOutcome::Cancelled),
        };

        tokio::fs::write(&destination, &archive.bytes).await?;
        Ok(DeliveryOutcome::Delivered)
    }
}

/// Tier 2: hand the staged archive to the platform's generic open/share
/// mechanism so the user can pick a persistent destination.
pub struct ShareHandoffTier {
    pub staging_dir: PathBuf,
}

#[async_trait]
impl DeliveryTier for ShareHandoffTier {
    fn name(&self) -> &'static str {
        "share-handoff"
    }

    async fn deliver(&self, archive: &CompiledArchive) -> Result<DeliveryOutcome> {
        let staged = self.staging_dir.join(&archive.file_name);
        tokio::fs::write(&staged, &archive.bytes).await?;

        tracing::info!(
            file = %staged.display(),
            "Handing archive to the system opener; choose a persistent-storage destination"
        );

        match open::that(&staged) {
            Ok(()) => Ok(DeliveryOutcome::Delivered),
            Err(e) => {
                tracing::debug!(error = %e, "System opener unavailable");
                // Release the staged copy; the fallback tier re-writes it.
                let _ = tokio::fs::remove_file(&staged).await;
                Ok(DeliveryOutcome::Unavailable)
            }
        }
    }
}

/// Tier 3: unconditional write into the downloads directory. Staged through
/// a temporary sibling so a crash mid-write never leaves a torn archive,
/// and the temporary is released regardless of outcome.
pub struct DownloadsFallbackTier {
    pub downloads_dir: PathBuf,
}

#[async_trait]
impl DeliveryTier for DownloadsFallbackTier {
    fn name(&self) -> &'static str {
        "downloads-fallback"
    }

    async fn deliver(&self, archive: &CompiledArchive) -> Result<DeliveryOutcome> {
        tokio::fs::create_dir_all(&self.downloads_dir).await?;

        let final_path = self.downloads_dir.join(&archive.file_name);
        let part_path = self.downloads_dir.join(format!(".{}.part", archive.file_name));

        let staged = tokio::fs::write(&part_path, &archive.bytes).await;
        let result = match staged {
            Ok(()) => tokio::fs::rename(&part_path, &final_path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(DeliveryOutcome::Delivered),
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn archive() -> CompiledArchive {
        CompiledArchive { file_name: "Main_St_OSP_EXPORT.zip".to_string(), bytes: vec![1, 2, 3] }
    }

    /// A tier with a scripted outcome that counts its invocations.
    struct ScriptedTier {
        outcome: DeliveryOutcome,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTier {
        fn boxed(outcome: DeliveryOutcome, calls: &Arc<AtomicUsize>) -> Box<dyn DeliveryTier> {
            Box::new(Self { outcome, calls: Arc::clone(calls) })
        }
    }

    #[async_trait]
    impl DeliveryTier for ScriptedTier {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn deliver(&self, _archive: &CompiledArchive) -> Result<DeliveryOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome)
        }
    }

    #[tokio::test]
    async fn save_picker_is_unavailable_without_a_terminal() {
        // The harness captures stdio, so the attended check fails and the
        // chain falls through without ever prompting.
        let outcome = SavePickerTier.deliver(&archive()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Unavailable);
    }

    #[tokio::test]
    async fn falls_through_unavailable_tiers_to_the_last() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tiers = vec![
            ScriptedTier::boxed(DeliveryOutcome::Unavailable, &calls),
            ScriptedTier::boxed(DeliveryOutcome::Unavailable, &calls),
            ScriptedTier::boxed(DeliveryOutcome::Delivered, &calls),
        ];

        let outcome = deliver_archive(&archive(), &tiers, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn user_cancellation_terminates_the_chain_cleanly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tiers = vec![
            ScriptedTier::boxed(DeliveryOutcome::Cancelled, &calls),
            ScriptedTier::boxed(DeliveryOutcome::Delivered, &calls),
        ];

        let outcome = deliver_archive(&archive(), &tiers, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Cancelled);
        // The second tier was never attempted.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whole_operation_cancellation_short_circuits_before_any_tier() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tiers = vec![ScriptedTier::boxed(DeliveryOutcome::Delivered, &calls)];

        let token = CancelToken::new();
        token.cancel();
        let result = deliver_archive(&archive(), &tiers, &token).await;

        assert!(matches!(result, Err(OspreyError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_is_an_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tiers = vec![
            ScriptedTier::boxed(DeliveryOutcome::Unavailable, &calls),
            ScriptedTier::boxed(DeliveryOutcome::Unavailable, &calls),
        ];

        let result = deliver_archive(&archive(), &tiers, &CancelToken::new()).await;
        assert!(matches!(result, Err(OspreyError::DeliveryExhausted)));
    }

    #[tokio::test]
    async fn downloads_fallback_writes_the_file_and_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DownloadsFallbackTier { downloads_dir: dir.path().to_path_buf() };

        let outcome = tier.deliver(&archive()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let written = std::fs::read(dir.path().join("Main_St_OSP_EXPORT.zip")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
        assert!(!dir.path().join(".Main_St_OSP_EXPORT.zip.part").exists());
    }
}
