use serde::{Deserialize, Serialize};

/// User-visible durability state of the survey document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// The last mutation has been durably committed.
    Saved,
    /// A write is in flight.
    Saving,
    /// Mutations exist that are not yet committed, or the last write
    /// failed. Surfaced as a persistent warning, not retried automatically;
    /// the next mutation's debounce cycle is the implicit retry.
    Unsaved,
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::Saved => write!(f, "SAVED"),
            SaveStatus::Saving => write!(f, "SAVING"),
            SaveStatus::Unsaved => write!(f, "UNSAVED"),
        }
    }
}
