use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::photo::SurveyPhoto;
use crate::error::{OspreyError, Result};

/// Unique identifier for a survey document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurveyId(pub Uuid);

impl SurveyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurveyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurveyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a pole survey point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoleId(pub Uuid);

impl PoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The full survey document for one site.
///
/// This is the single unit of durability for the document store: the whole
/// document is serialized and committed on every autosave. The `id` is
/// assigned once at creation and never changes for the document's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSurvey {
    pub id: SurveyId,
    pub site_name: String,
    pub company_name: String,
    pub group_name: String,
    /// Poles in placement order.
    pub poles: Vec<PoleSurvey>,
}

impl SiteSurvey {
    /// Create a fresh project with default field headers.
    pub fn new_project() -> Self {
        Self {
            id: SurveyId::new(),
            site_name: "ACTIVE OSP PROJECT".to_string(),
            company_name: "FIELD OPERATIONS".to_string(),
            group_name: "SURVEY GROUP 1".to_string(),
            poles: Vec::new(),
        }
    }

    pub fn pole(&self, id: PoleId) -> Option<&PoleSurvey> {
        self.poles.iter().find(|p| p.id == id)
    }

    pub fn pole_mut(&mut self, id: PoleId) -> Option<&mut PoleSurvey> {
        self.poles.iter_mut().find(|p| p.id == id)
    }

    /// Sequential display name for the next pole (`POLE-001`, `POLE-002`, ...).
    pub fn next_pole_name(&self) -> String {
        format!("POLE-{:03}", self.poles.len() + 1)
    }
}

/// A single geotagged survey point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleSurvey {
    pub id: PoleId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above the ellipsoid, when the fix carried one.
    pub altitude: Option<f64>,
    /// Creation instant, immutable after placement.
    pub timestamp: DateTime<Utc>,
    /// Photos in capture order.
    pub photos: Vec<SurveyPhoto>,
    pub notes: String,
}

impl PoleSurvey {
    /// Create a pole at a tapped map coordinate.
    ///
    /// Latitude must be finite; a NaN or infinite fix from a flaky GPS
    /// provider is rejected before it can poison the document.
    pub fn at(name: String, latitude: f64, longitude: f64, altitude: Option<f64>) -> Result<Self> {
        if latitude.is_nan() || !latitude.is_finite() {
            return Err(OspreyError::InvalidCoordinate {
                reason: format!("latitude {latitude} is not a finite number"),
            });
        }
        Ok(Self {
            id: PoleId::new(),
            name,
            latitude,
            longitude,
            altitude,
            timestamp: Utc::now(),
            photos: Vec::new(),
            notes: String::new(),
        })
    }

    /// Apply a partial update, last-write-wins per field.
    pub fn apply(&mut self, update: PoleUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(latitude) = update.latitude {
            self.latitude = latitude;
        }
        if let Some(longitude) = update.longitude {
            self.longitude = longitude;
        }
        if let Some(altitude) = update.altitude {
            self.altitude = altitude;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
    }
}

/// Partial-update merge for a pole. `None` fields are left untouched;
/// `altitude` is doubly optional so an update can clear it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoleUpdate {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<Option<f64>>,
    pub notes: Option<String>,
}
