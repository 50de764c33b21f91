use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a survey photo. Doubles as the content key in the
/// blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub Uuid);

impl PhotoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PhotoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Field QA status of a captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhotoStatus {
    Pending,
    Passed,
    Retake,
}

/// A photo record inside the survey document.
///
/// The document and the blob store are two separate durability domains. Only
/// the small thumbnail preview lives here; the full-resolution binary lives
/// in the blob store under the same `PhotoId`. `is_stored_in_db` is set only
/// after the blob write has succeeded, so the document can never reference a
/// binary that was never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPhoto {
    pub id: PhotoId,
    /// Inline-encoded preview, small enough to keep in the document for
    /// fast listing.
    pub thumbnail: String,
    pub timestamp: DateTime<Utc>,
    pub status: PhotoStatus,
    pub remarks: Option<String>,
    /// Capture-time GPS fix. Independent of the pole's placed coordinate;
    /// the fix at shutter time may differ from where the pole was dropped
    /// on the map.
    pub captured_lat: Option<f64>,
    pub captured_lng: Option<f64>,
    /// True once the full-resolution binary has been durably committed to
    /// the blob store.
    pub is_stored_in_db: bool,
}

impl SurveyPhoto {
    /// A record for a blob that has already been committed.
    pub fn stored(id: PhotoId, thumbnail: String, captured: Option<(f64, f64)>) -> Self {
        Self {
            id,
            thumbnail,
            timestamp: Utc::now(),
            status: PhotoStatus::Pending,
            remarks: None,
            captured_lat: captured.map(|(lat, _)| lat),
            captured_lng: captured.map(|(_, lng)| lng),
            is_stored_in_db: true,
        }
    }

    /// Apply a partial update, last-write-wins per field.
    pub fn apply(&mut self, update: PhotoUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(remarks) = update.remarks {
            self.remarks = remarks;
        }
    }
}

/// Partial-update merge for a photo record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoUpdate {
    pub status: Option<PhotoStatus>,
    pub remarks: Option<Option<String>>,
}
