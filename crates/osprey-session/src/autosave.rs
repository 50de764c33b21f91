//! The autosave coordinator.
//!
//! Observes survey mutations as full-document snapshots, debounces them,
//! and drives the document store, publishing a tri-state [`SaveStatus`] on
//! a watch channel. Each debounce cycle carries a generation number;
//! superseded cycles never write (commit order equals schedule order, and
//! only the most recent scheduled write may ever commit).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use osprey_core::config::AutosaveTuning;
use osprey_core::models::{SiteSurvey, StorageEstimate};
use osprey_store::ports::{DocumentStore, StorageHealth};

use crate::cancel::CancelToken;
use crate::status::SaveStatus;

pub struct AutosaveCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    documents: Arc<dyn DocumentStore>,
    health: Arc<dyn StorageHealth>,
    key: String,
    tuning: AutosaveTuning,
    status_tx: watch::Sender<SaveStatus>,
    estimate_tx: watch::Sender<Option<StorageEstimate>>,
    /// Debounce-cycle generation. Only the cycle matching the latest
    /// generation may issue or report a write.
    generation: AtomicU64,
    /// Batches the delayed post-save quota probes: rapid successive saves
    /// supersede each other's probe.
    health_generation: AtomicU64,
    /// Serializes durable writes so commit order equals schedule order.
    write_lock: tokio::sync::Mutex<()>,
    shutdown: CancelToken,
}

impl AutosaveCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        health: Arc<dyn StorageHealth>,
        key: impl Into<String>,
        tuning: AutosaveTuning,
    ) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Saved);
        let (estimate_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                documents,
                health,
                key: key.into(),
                tuning,
                status_tx,
                estimate_tx,
                generation: AtomicU64::new(0),
                health_generation: AtomicU64::new(0),
                write_lock: tokio::sync::Mutex::new(()),
                shutdown: CancelToken::new(),
            }),
        }
    }

    /// Watch the save status.
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn current_status(&self) -> SaveStatus {
        *self.inner.status_tx.borrow()
    }

    /// Watch the batched storage-health snapshots published after saves.
    pub fn storage_estimate(&self) -> watch::Receiver<Option<StorageEstimate>> {
        self.inner.estimate_tx.subscribe()
    }

    /// Record that a prior document was loaded and applied. Hydration is
    /// not a mutation; it only resets the status to `Saved` and schedules
    /// nothing, so loading never marks the document dirty.
    pub fn mark_hydrated(&self) {
        self.inner.status_tx.send_replace(SaveStatus::Saved);
    }

    /// Note a mutated document snapshot and schedule a debounced write.
    pub fn note_mutation(&self, snapshot: SiteSurvey) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        self.inner.status_tx.send_replace(SaveStatus::Unsaved);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(inner.tuning.debounce) => {}
                _ = inner.shutdown.cancelled() => return,
            }
            Inner::commit(&inner, generation, snapshot).await;
        });
    }

    /// Final best-effort write on teardown. Never retried, never raised;
    /// callers must not block shutdown on the outcome beyond this await.
    pub async fn flush(&self, snapshot: &SiteSurvey) {
        if self.current_status() == SaveStatus::Saved {
            return;
        }
        match self.inner.documents.save_document(&self.inner.key, snapshot).await {
            Ok(()) => {
                self.inner.status_tx.send_replace(SaveStatus::Saved);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Final teardown save failed");
            }
        }
    }

    /// Cancel all pending debounce timers and invalidate in-flight cycles.
    pub fn shutdown(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn commit(inner: &Arc<Inner>, generation: u64, snapshot: SiteSurvey) {
        // Superseded while debouncing: this cycle never writes.
        if !inner.is_current(generation) {
            return;
        }

        let _write = inner.write_lock.lock().await;
        // Superseded while queued behind an in-flight write.
        if !inner.is_current(generation) {
            return;
        }

        inner.status_tx.send_replace(SaveStatus::Saving);

        let result = tokio::time::timeout(
            inner.tuning.save_timeout,
            inner.documents.save_document(&inner.key, &snapshot),
        )
        .await;

        // A newer cycle may have started while the write was in flight;
        // only the current generation may report status.
        let current = inner.is_current(generation);
        match result {
            Ok(Ok(())) => {
                if current {
                    inner.status_tx.send_replace(SaveStatus::Saved);
                }
                Inner::schedule_health_refresh(inner);
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Autosave write failed");
                if current {
                    inner.status_tx.send_replace(SaveStatus::Unsaved);
                }
            }
            Err(_) => {
                tracing::error!(
                    seconds = inner.tuning.save_timeout.as_secs(),
                    "Autosave write timed out"
                );
                if current {
                    inner.status_tx.send_replace(SaveStatus::Unsaved);
                }
            }
        }
    }

    fn schedule_health_refresh(inner: &Arc<Inner>) {
        let health_generation = inner.health_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(inner.tuning.health_refresh_delay) => {}
                _ = inner.shutdown.cancelled() => return,
            }
            // A later save superseded this probe; it will run its own.
            if inner.health_generation.load(Ordering::SeqCst) != health_generation {
                return;
            }
            let estimate = inner.health.estimate().await;
            inner.estimate_tx.send_replace(Some(estimate));
        });
    }
}
