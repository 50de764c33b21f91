pub mod license;
pub mod photo;
pub mod storage;
pub mod survey;

pub use license::LicenseStatus;
pub use photo::{PhotoId, PhotoStatus, PhotoUpdate, SurveyPhoto};
pub use storage::StorageEstimate;
pub use survey::{PoleId, PoleSurvey, PoleUpdate, SiteSurvey, SurveyId};
