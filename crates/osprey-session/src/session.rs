//! The survey session: single writer of the in-memory document.
//!
//! Components never share mutable survey state. The session owns the
//! document, applies mutation intents, and hands full snapshots to the
//! autosave coordinator. The blob store and the document store are separate
//! durability domains; the session keeps them referentially consistent by
//! writing blobs first and cascading deletes.

use std::sync::Arc;

use osprey_core::config::AutosaveTuning;
use osprey_core::error::{OspreyError, Result};
use osprey_core::models::{
    LicenseStatus, PhotoId, PhotoUpdate, PoleId, PoleSurvey, PoleUpdate, SiteSurvey, SurveyPhoto,
};
use osprey_core::ports::LicenseService;
use osprey_core::DOCUMENT_KEY;
use osprey_store::ports::{BlobStore, DocumentStore, StorageHealth};

use crate::autosave::AutosaveCoordinator;
use crate::cancel::{CancelScopes, OperationKind};

pub struct Session {
    survey: SiteSurvey,
    blobs: Arc<dyn BlobStore>,
    autosave: AutosaveCoordinator,
    scopes: Arc<CancelScopes>,
}

impl Session {
    /// Open a session: hydrate the prior document if one exists, otherwise
    /// start a fresh project. A failed load is degraded to a fresh project
    /// with a warning; persistence failures must never stop field work.
    pub async fn open(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        health: Arc<dyn StorageHealth>,
        tuning: AutosaveTuning,
    ) -> Self {
        let scopes = Arc::new(CancelScopes::new());
        let autosave =
            AutosaveCoordinator::new(Arc::clone(&documents), health, DOCUMENT_KEY, tuning);

        let load_token = scopes.begin(OperationKind::Load);
        let survey = match documents.load_document(DOCUMENT_KEY).await {
            _ if load_token.is_cancelled() => SiteSurvey::new_project(),
            Ok(Some(saved)) => {
                autosave.mark_hydrated();
                saved
            }
            Ok(None) => SiteSurvey::new_project(),
            Err(e) => {
                tracing::warn!(error = %e, "Document load failed; starting a fresh project");
                SiteSurvey::new_project()
            }
        };

        Self { survey, blobs, autosave, scopes }
    }

    pub fn survey(&self) -> &SiteSurvey {
        &self.survey
    }

    pub fn autosave(&self) -> &AutosaveCoordinator {
        &self.autosave
    }

    pub fn scopes(&self) -> &Arc<CancelScopes> {
        &self.scopes
    }

    fn note_mutation(&self) {
        self.autosave.note_mutation(self.survey.clone());
    }

    /// Place a pole at a tapped coordinate. Rejects non-finite latitude.
    pub fn add_pole(&mut self, lat: f64, lng: f64, altitude: Option<f64>) -> Result<PoleId> {
        let pole = PoleSurvey::at(self.survey.next_pole_name(), lat, lng, altitude)?;
        let id = pole.id;
        self.survey.poles.push(pole);
        self.note_mutation();
        Ok(id)
    }

    pub fn update_pole(&mut self, id: PoleId, update: PoleUpdate) -> Result<()> {
        let pole = self
            .survey
            .pole_mut(id)
            .ok_or_else(|| OspreyError::PoleNotFound { id: id.to_string() })?;
        pole.apply(update);
        self.note_mutation();
        Ok(())
    }

    /// Batch partial updates. Unknown ids are skipped, matching the
    /// last-write-wins merge model.
    pub fn update_poles(&mut self, updates: Vec<(PoleId, PoleUpdate)>) {
        for (id, update) in updates {
            if let Some(pole) = self.survey.pole_mut(id) {
                pole.apply(update);
            }
        }
        self.note_mutation();
    }

    /// Delete poles and cascade to their photos' blobs. A blob delete that
    /// fails leaves harmless garbage and is only logged; the document
    /// mutation still proceeds.
    pub async fn delete_poles(&mut self, ids: &[PoleId]) {
        let mut doomed_photos: Vec<PhotoId> = Vec::new();
        for pole in &self.survey.poles {
            if ids.contains(&pole.id) {
                doomed_photos.extend(pole.photos.iter().map(|photo| photo.id));
            }
        }

        self.survey.poles.retain(|pole| !ids.contains(&pole.id));

        for photo_id in doomed_photos {
            if let Err(e) = self.blobs.delete_blob(photo_id).await {
                tracing::warn!(photo = %photo_id, error = %e, "Cascade blob delete failed");
            }
        }

        self.note_mutation();
    }

    /// Attach a captured photo. Two-phase: the full-resolution binary is
    /// committed to the blob store first, and the photo record is appended
    /// to the document only after that write succeeded. A failed blob write
    /// adds no record, so the document can never reference a binary that
    /// was never written.
    pub async fn attach_photo(
        &mut self,
        pole_id: PoleId,
        bytes: &[u8],
        thumbnail: String,
        captured: Option<(f64, f64)>,
    ) -> Result<PhotoId> {
        if self.survey.pole(pole_id).is_none() {
            return Err(OspreyError::PoleNotFound { id: pole_id.to_string() });
        }

        let photo_id = PhotoId::new();
        self.blobs.save_blob(photo_id, bytes).await?;

        // The record carries is_stored_in_db = true: the blob write above
        // already committed.
        let photo = SurveyPhoto::stored(photo_id, thumbnail, captured);
        if let Some(pole) = self.survey.pole_mut(pole_id) {
            pole.photos.push(photo);
        }
        self.note_mutation();
        Ok(photo_id)
    }

    pub fn update_photo(
        &mut self,
        pole_id: PoleId,
        photo_id: PhotoId,
        update: PhotoUpdate,
    ) -> Result<()> {
        let pole = self
            .survey
            .pole_mut(pole_id)
            .ok_or_else(|| OspreyError::PoleNotFound { id: pole_id.to_string() })?;
        let photo = pole
            .photos
            .iter_mut()
            .find(|photo| photo.id == photo_id)
            .ok_or_else(|| OspreyError::BlobMissing { id: photo_id.to_string() })?;
        photo.apply(update);
        self.note_mutation();
        Ok(())
    }

    pub fn set_site_name(&mut self, name: impl Into<String>) {
        self.survey.site_name = name.into();
        self.note_mutation();
    }

    pub fn set_company_name(&mut self, name: impl Into<String>) {
        self.survey.company_name = name.into();
        self.note_mutation();
    }

    pub fn set_group_name(&mut self, name: impl Into<String>) {
        self.survey.group_name = name.into();
        self.note_mutation();
    }

    /// Run the licensing check under its own cancellation scope. A check
    /// superseded or torn down mid-flight reports inactive rather than
    /// surfacing an error.
    pub async fn check_license(&self, service: &dyn LicenseService) -> LicenseStatus {
        let token = self.scopes.begin(OperationKind::License);
        match service.subscription_status().await {
            _ if token.is_cancelled() => LicenseStatus::inactive(),
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Subscription check failed");
                LicenseStatus::inactive()
            }
        }
    }

    /// Tear the session down: signal every outstanding scope, cancel
    /// pending timers, and attempt one final best-effort write.
    pub async fn close(self) {
        self.scopes.shutdown();
        self.autosave.shutdown();
        self.autosave.flush(&self.survey).await;
    }
}
