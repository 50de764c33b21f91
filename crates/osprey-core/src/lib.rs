//! Osprey Core - Domain models, error taxonomy, and configuration
//!
//! This crate contains the core domain types and collaborator port
//! definitions for the Osprey survey pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{OspreyError, Result};

/// Versioned key identifying the current survey document in the document
/// store. Changing the persisted schema requires bumping the version and
/// migrating or discarding prior keys.
pub const DOCUMENT_KEY: &str = "osp_survey_v4_state";
