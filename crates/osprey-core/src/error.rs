//! Error types for Osprey

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OspreyError {
    // Storage errors
    #[error("Storage backend unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("Storage write failed for key {key}: {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("Storage read failed for key {key}: {reason}")]
    StorageRead { key: String, reason: String },

    // Blob errors
    #[error("Blob write failed for photo {id}: {reason}")]
    BlobWrite { id: String, reason: String },

    #[error("Blob not found for photo {id}")]
    BlobMissing { id: String },

    // Document errors
    #[error("Pole not found: {id}")]
    PoleNotFound { id: String },

    #[error("Invalid coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    // Export errors
    #[error("Archive compilation failed: {reason}")]
    Archive { reason: String },

    #[error("No delivery tier available for the compiled archive")]
    DeliveryExhausted,

    // Cancellation is a clean termination, never surfaced as a user-facing
    // failure. Callers match on it explicitly.
    #[error("Operation cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OspreyError {
    /// Whether this error is a system-triggered cancellation rather than a
    /// genuine failure. Cancellations are suppressed from user-facing alerts.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OspreyError::Cancelled)
    }
}

impl From<serde_json::Error> for OspreyError {
    fn from(e: serde_json::Error) -> Self {
        OspreyError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OspreyError>;
