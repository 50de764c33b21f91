//! Osprey Session - Autosave coordination and the survey mutation API
//!
//! The session owns the in-memory survey document (single writer) and feeds
//! snapshots to the autosave coordinator, which debounces them into durable
//! writes and publishes a tri-state save status.

pub mod autosave;
pub mod cancel;
pub mod session;
pub mod status;

pub use autosave::AutosaveCoordinator;
pub use cancel::{CancelScopes, CancelToken, OperationKind};
pub use session::Session;
pub use status::SaveStatus;
